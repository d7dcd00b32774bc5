//! Standalone video gallery page.
//!
//! Writes a single HTML file next to the videos. The file list is embedded
//! as JSON and paginated client side so thousands of videos stay responsive.

use std::io;
use std::path::Path;

/// Extensions picked up by the gallery (lowercase, no dot)
pub const GALLERY_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Default output file name inside the root
pub const DEFAULT_OUTPUT: &str = "gallery.html";

/// Cards rendered per page
pub const ITEMS_PER_PAGE: usize = 50;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Video Gallery (__COUNT__ videos)</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            background-color: #0a0a0a;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            padding: 20px;
            min-height: 100vh;
            color: #fff;
            display: flex;
            flex-direction: column;
        }
        .header { text-align: center; padding: 20px; margin-bottom: 20px; }
        .header h1 { font-size: 2rem; font-weight: 600; margin-bottom: 10px; color: #8b9cf0; }
        .controls {
            display: flex;
            justify-content: center;
            align-items: center;
            gap: 15px;
            margin: 0 auto 30px;
            position: sticky;
            top: 20px;
            z-index: 100;
            background: rgba(10, 10, 10, 0.9);
            padding: 15px;
            border-radius: 50px;
            border: 1px solid rgba(255, 255, 255, 0.1);
            width: fit-content;
        }
        .btn {
            background: #2a2a2a;
            color: white;
            border: none;
            padding: 8px 16px;
            border-radius: 20px;
            cursor: pointer;
        }
        .btn:hover:not(:disabled) { background: #667eea; }
        .btn:disabled { opacity: 0.5; cursor: not-allowed; }
        .page-info { font-family: monospace; font-size: 1.1rem; color: #ccc; }
        #page-input {
            background: #1a1a1a;
            border: 1px solid #333;
            color: white;
            padding: 5px 10px;
            border-radius: 5px;
            width: 60px;
            text-align: center;
        }
        .gallery {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(280px, 1fr));
            gap: 16px;
            max-width: 1800px;
            width: 100%;
            margin: 0 auto;
        }
        .video-card {
            position: relative;
            border-radius: 12px;
            overflow: hidden;
            background: #1a1a1a;
            display: block;
            aspect-ratio: 1 / 1;
        }
        .video-card:nth-child(5n+1), .video-card:nth-child(5n+4) { aspect-ratio: 3 / 4; }
        .video-card:nth-child(5n+3) { aspect-ratio: 4 / 5; }
        .video-element { width: 100%; height: 100%; object-fit: cover; display: block; }
        .video-name {
            position: absolute;
            bottom: 0;
            left: 0;
            right: 0;
            padding: 40px 12px 12px;
            background: linear-gradient(to top, rgba(0, 0, 0, 0.8) 0%, transparent 100%);
            font-size: 0.85rem;
            white-space: nowrap;
            overflow: hidden;
            text-overflow: ellipsis;
        }
        .video-card.failed { border: 1px solid #ff4444; }
        .video-card.failed .video-element { opacity: 0.1; }
        @media (max-width: 768px) {
            .gallery { grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 10px; }
        }
    </style>
</head>
<body>
    <div class="header">
        <h1>Video Gallery</h1>
        <p>__COUNT__ videos available</p>
    </div>
    <div class="controls">
        <button class="btn" id="btn-first" title="First Page">&laquo;</button>
        <button class="btn" id="btn-prev" title="Previous Page">&lsaquo; Prev</button>
        <div class="page-info">
            Page <input type="number" id="page-input" min="1" value="1"> of <span id="total-pages">--</span>
        </div>
        <button class="btn" id="btn-next" title="Next Page">Next &rsaquo;</button>
        <button class="btn" id="btn-last" title="Last Page">&raquo;</button>
    </div>
    <div class="gallery" id="gallery-grid"></div>
    <script>
        const videoList = __VIDEOS__;
        const ITEMS_PER_PAGE = __PER_PAGE__;
        const totalPages = Math.max(1, Math.ceil(videoList.length / ITEMS_PER_PAGE));
        let currentPage = 1;

        const grid = document.getElementById('gallery-grid');
        const pageInput = document.getElementById('page-input');
        const totalPagesSpan = document.getElementById('total-pages');
        const btnPrev = document.getElementById('btn-prev');
        const btnNext = document.getElementById('btn-next');
        const btnFirst = document.getElementById('btn-first');
        const btnLast = document.getElementById('btn-last');

        const videoObserver = new IntersectionObserver((entries) => {
            entries.forEach((entry) => {
                const video = entry.target;
                if (entry.isIntersecting) {
                    if (video.paused) {
                        video.play().catch(() => {});
                    }
                } else {
                    video.pause();
                }
            });
        }, { root: null, rootMargin: '100px', threshold: 0.1 });

        function renderPage(page) {
            page = Math.min(Math.max(page, 1), totalPages);
            currentPage = page;

            pageInput.value = page;
            totalPagesSpan.textContent = totalPages;
            btnPrev.disabled = btnFirst.disabled = page === 1;
            btnNext.disabled = btnLast.disabled = page === totalPages;

            grid.innerHTML = '';
            const start = (page - 1) * ITEMS_PER_PAGE;
            const fragment = document.createDocumentFragment();

            videoList.slice(start, start + ITEMS_PER_PAGE).forEach((filename) => {
                const card = document.createElement('a');
                card.className = 'video-card';
                card.href = encodeURIComponent(filename);
                card.target = '_blank';

                const video = document.createElement('video');
                video.className = 'video-element';
                video.loop = true;
                video.muted = true;
                video.playsInline = true;
                video.src = encodeURIComponent(filename);
                video.onerror = () => card.classList.add('failed');

                const name = document.createElement('span');
                name.className = 'video-name';
                name.textContent = filename.replace(/\.[^/.]+$/, '');

                card.append(video, name);
                videoObserver.observe(video);
                fragment.appendChild(card);
            });

            grid.appendChild(fragment);
            window.scrollTo({ top: 0, behavior: 'smooth' });
        }

        btnPrev.addEventListener('click', () => renderPage(currentPage - 1));
        btnNext.addEventListener('click', () => renderPage(currentPage + 1));
        btnFirst.addEventListener('click', () => renderPage(1));
        btnLast.addEventListener('click', () => renderPage(totalPages));
        pageInput.addEventListener('change', (e) => {
            const value = parseInt(e.target.value, 10);
            if (value) renderPage(value);
        });

        renderPage(1);
    </script>
</body>
</html>
"#;

/// Video files directly under `dir`, sorted case-insensitively
pub fn collect_videos(dir: &Path) -> io::Result<Vec<String>> {
    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_gallery_video(&name) {
            videos.push(name);
        }
    }
    videos.sort_by_cached_key(|name| name.to_lowercase());
    Ok(videos)
}

fn is_gallery_video(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| GALLERY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn render_gallery(videos: &[String]) -> String {
    // `</` would end the script element early
    let list = serde_json::to_string(videos)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    TEMPLATE
        .replace("__COUNT__", &group_thousands(videos.len()))
        .replace("__PER_PAGE__", &ITEMS_PER_PAGE.to_string())
        .replace("__VIDEOS__", &list)
}

/// Scan `root` and write the gallery to `output`. Returns the video count.
pub fn write_gallery(root: &Path, output: &Path) -> io::Result<usize> {
    tracing::info!("Scanning {} for videos", root.display());
    let videos = collect_videos(root)?;
    std::fs::write(output, render_gallery(&videos))?;
    tracing::info!("Gallery with {} videos written to {}", videos.len(), output.display());
    Ok(videos.len())
}

/// `12345` -> `12,345`
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
