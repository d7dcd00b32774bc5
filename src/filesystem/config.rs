use std::path::{Path, PathBuf};

/// Video containers recognised by default
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "avi", "mov", "mkv"];

/// Image formats recognised by default
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Version-control folder, never offered as a destination
pub const VCS_DIR: &str = ".git";

/// How the random part of shortcut assignment is seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutMode {
    /// Fresh randomness on every listing
    #[default]
    PerRequest,
    /// Seeded from the process session token and the folder set, so an
    /// unchanged folder set keeps its shortcuts until restart
    Session,
}

/// Configuration for the media library under a single root
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Directory every file and folder name is resolved against
    pub root: PathBuf,

    /// Lowercase extensions (without dot) listed as media
    pub media_extensions: Vec<String>,

    /// Folder that deleted files are moved into
    pub trash_dir: String,

    /// Folder used by external deletion workflows, hidden from listings
    pub deletion_dir: String,

    pub shortcut_mode: ShortcutMode,
}

impl LibraryConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Folders never listed as destinations
    pub fn is_reserved_dir(&self, name: &str) -> bool {
        name == self.trash_dir || name == self.deletion_dir || name == VCS_DIR
    }

    /// Case-insensitive extension match against the media set
    pub fn is_media_file(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.media_extensions.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            media_extensions: VIDEO_EXTENSIONS
                .iter()
                .chain(IMAGE_EXTENSIONS)
                .map(|ext| ext.to_string())
                .collect(),
            trash_dir: "trash".to_string(),
            deletion_dir: "deleteVideos".to_string(),
            shortcut_mode: ShortcutMode::PerRequest,
        }
    }
}
