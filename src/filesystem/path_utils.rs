use std::path::{Path, PathBuf};

use crate::protocol::FileSystemError;

use super::platform;

/// Create `dir` and any missing parents. An existing directory is fine; a
/// regular file anywhere along the way is reported as `NotADirectory`.
pub async fn ensure_directory(dir: &Path) -> Result<(), FileSystemError> {
    if let Some(file) = find_file_component(dir) {
        return Err(FileSystemError::NotADirectory {
            path: file.display().to_string(),
        });
    }

    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        if platform::is_not_a_directory(&e) {
            if let Some(file) = find_file_component(dir) {
                return FileSystemError::NotADirectory {
                    path: file.display().to_string(),
                };
            }
        }
        FileSystemError::IoError {
            message: e.to_string(),
        }
    })
}

fn find_file_component(path: &Path) -> Option<PathBuf> {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        if current.is_file() {
            return Some(current);
        }
    }
    None
}
