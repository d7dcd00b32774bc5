use std::path::{Path, PathBuf};

use tokio::fs;

use crate::protocol::FileSystemError;

use super::config::LibraryConfig;
use super::path_utils;
use super::platform;
use super::security::PathValidator;

/// Media files and destination folders found directly under the root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Media file names, ordinal byte order
    pub files: Vec<String>,
    /// Destination folder names, ordinal byte order
    pub dirs: Vec<String>,
}

#[derive(Clone)]
pub struct FileOperations {
    validator: std::sync::Arc<PathValidator>,
    config: std::sync::Arc<LibraryConfig>,
}

impl FileOperations {
    pub fn new(
        validator: std::sync::Arc<PathValidator>,
        config: std::sync::Arc<LibraryConfig>,
    ) -> Self {
        Self { validator, config }
    }

    /// Enumerate the root once. Any enumeration failure fails the whole scan.
    pub async fn scan(&self) -> Result<Listing, FileSystemError> {
        let mut listing = Listing::default();
        let mut read_dir = fs::read_dir(self.validator.root())
            .await
            .map_err(|e| FileSystemError::IoError {
                message: e.to_string(),
            })?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FileSystemError::IoError {
                message: e.to_string(),
            })?
        {
            let entry_path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("Skipping non UTF-8 entry {}", entry_path.display());
                continue;
            };
            if platform::is_hidden(&entry_path) {
                continue;
            }
            // Follows symlinks; dangling links are skipped.
            let Ok(metadata) = fs::metadata(&entry_path).await else {
                continue;
            };

            if metadata.is_file() && self.config.is_media_file(&name) {
                listing.files.push(name);
            } else if metadata.is_dir() && !self.config.is_reserved_dir(&name) {
                listing.dirs.push(name);
            }
        }

        listing.files.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    /// Move `filename` into the `target` folder, creating the folder if needed.
    ///
    /// Only the base name of `filename` is kept at the destination. The move
    /// is a single rename; on failure the source is left where it was. Both
    /// ends must resolve inside the root after following symlinks.
    pub async fn move_to(&self, filename: &str, target: &str) -> Result<PathBuf, FileSystemError> {
        let source = self.validator.resolve(filename)?;
        self.validator.resolve(target)?;
        self.relocate(filename, &source, target).await
    }

    /// Move `filename` into the trash folder
    pub async fn trash(&self, filename: &str) -> Result<PathBuf, FileSystemError> {
        let source = self.validator.resolve(filename)?;
        self.validator.resolve(&self.config.trash_dir)?;
        self.relocate(filename, &source, &self.config.trash_dir).await
    }

    async fn relocate(
        &self,
        filename: &str,
        source: &Path,
        target: &str,
    ) -> Result<PathBuf, FileSystemError> {
        self.validator.resolve_existing(filename).await?;

        let metadata = fs::metadata(source).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileSystemError::NotFound {
                path: filename.to_string(),
            },
            _ => FileSystemError::IoError {
                message: e.to_string(),
            },
        })?;

        if !metadata.is_file() {
            return Err(FileSystemError::NotAFile {
                path: filename.to_string(),
            });
        }

        let base_name = source.file_name().ok_or_else(|| FileSystemError::NotAFile {
            path: filename.to_string(),
        })?;

        let target_dir = self.validator.resolve_contained(target).await?;
        path_utils::ensure_directory(&target_dir).await?;
        self.validator.resolve_existing(target).await?;

        let destination = target_dir.join(base_name);
        let occupied = fs::try_exists(&destination)
            .await
            .map_err(|e| FileSystemError::IoError {
                message: e.to_string(),
            })?;
        if occupied {
            return Err(FileSystemError::AlreadyExists {
                path: self.display_relative(&destination),
            });
        }

        fs::rename(source, &destination)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FileSystemError::NotFound {
                    path: filename.to_string(),
                },
                _ => FileSystemError::IoError {
                    message: e.to_string(),
                },
            })?;

        Ok(destination)
    }

    /// Path relative to the root for messages shown to the client
    pub fn display_relative(&self, path: &Path) -> String {
        path.strip_prefix(self.validator.root())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
