use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a file on disk: extension first, content sniffing for
/// anything the extension table does not know
pub fn detect_mime_type(path: &Path) -> String {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let guessed = guess_mime_from_extension(filename);
    if guessed != OCTET_STREAM {
        return with_charset(guessed);
    }

    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.mime_type().to_string(),
        _ => OCTET_STREAM.to_string(),
    }
}

/// Guess MIME type based on filename extension
pub fn guess_mime_from_extension(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "vtt" => "text/vtt",
        "srt" => "application/x-subrip",
        "woff2" => "font/woff2",
        _ => OCTET_STREAM,
    }
}

/// Check if MIME type is text-based (served with an explicit charset)
pub fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/javascript"
        || mime.ends_with("+xml")
}

fn with_charset(mime: &str) -> String {
    if is_text_mime(mime) {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}
