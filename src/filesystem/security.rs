use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use path_jail::Jail;

use crate::protocol::FileSystemError;

use super::config::LibraryConfig;

/// Reject names that could escape the root.
///
/// Relative subpaths such as `sub/file.mp4` are accepted; anything containing
/// `..`, an absolute path, a drive prefix or an empty name is not.
pub fn validate(name: &str) -> Result<&str, FileSystemError> {
    let path = Path::new(name);
    if name.is_empty() || name.contains("..") || has_root(path) {
        return Err(FileSystemError::PathTraversal {
            attempted_path: name.to_string(),
        });
    }
    Ok(name)
}

/// Resolves client-supplied names against the library root
pub struct PathValidator {
    config: Arc<LibraryConfig>,
    jail: Option<Jail>,
    canonical_root: Option<PathBuf>,
}

impl PathValidator {
    pub fn new(config: Arc<LibraryConfig>) -> Self {
        let jail = match Jail::new(&config.root) {
            Ok(jail) => Some(jail),
            Err(e) => {
                tracing::warn!("Root {} is not accessible: {}", config.root.display(), e);
                None
            }
        };
        let canonical_root = config.root.canonicalize().ok();
        Self {
            config,
            jail,
            canonical_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Join a validated name onto the root without touching the disk
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FileSystemError> {
        let name = validate(name)?;
        Ok(self.config.root.join(name))
    }

    /// Resolve a name that must exist, following symlinks, and make sure the
    /// final target is still inside the root
    pub async fn resolve_existing(&self, name: &str) -> Result<PathBuf, FileSystemError> {
        let path = self.resolve(name)?;
        let canonical = tokio::fs::canonicalize(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileSystemError::NotFound {
                    path: name.to_string(),
                },
                _ => FileSystemError::IoError {
                    message: e.to_string(),
                },
            })?;

        self.ensure_inside_root(&canonical)?;
        Ok(canonical)
    }

    /// Resolve a name that may not exist yet. The deepest existing ancestor
    /// is canonicalized and must lie inside the root, so missing folders are
    /// never created through a symlink that points elsewhere.
    pub async fn resolve_contained(&self, name: &str) -> Result<PathBuf, FileSystemError> {
        let path = self.resolve(name)?;
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            match tokio::fs::canonicalize(ancestor).await {
                Ok(canonical) => {
                    self.ensure_inside_root(&canonical)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(FileSystemError::IoError {
                        message: e.to_string(),
                    })
                }
            }
        }
        Err(FileSystemError::NotFound {
            path: name.to_string(),
        })
    }

    /// Check an already canonical path against the root
    pub fn ensure_inside_root(&self, path: &Path) -> Result<(), FileSystemError> {
        let is_root = self.canonical_root.as_deref() == Some(path);
        let inside = is_root
            || self
                .jail
                .as_ref()
                .map(|jail| jail.contains(path).is_ok())
                .unwrap_or(false);

        if !inside {
            return Err(FileSystemError::PermissionDenied {
                path: path.display().to_string(),
                reason: "Path is outside the served directory".to_string(),
            });
        }

        Ok(())
    }
}

fn has_root(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}
