//! Media library service: scanning, shortcut labelling and file moves under
//! a single root

pub mod config;
pub mod mime;
pub mod operations;
pub mod path_utils;
pub mod platform;
pub mod security;
pub mod shortcuts;


use std::sync::Arc;

use config::LibraryConfig;
use operations::FileOperations;
use security::PathValidator;
use shortcuts::ShortcutAssigner;

use crate::protocol::{FileSystemError, ListResponse};

pub struct LibraryService {
    config: Arc<LibraryConfig>,
    validator: Arc<PathValidator>,
    ops: FileOperations,
    shortcuts: ShortcutAssigner,
}

impl LibraryService {
    pub fn new(config: LibraryConfig) -> Self {
        let config = Arc::new(config);
        let validator = Arc::new(PathValidator::new(config.clone()));
        let ops = FileOperations::new(validator.clone(), config.clone());
        let shortcuts = ShortcutAssigner::new(config.shortcut_mode);
        Self {
            config,
            validator,
            ops,
            shortcuts,
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        self.config.as_ref()
    }

    pub fn validator(&self) -> &PathValidator {
        self.validator.as_ref()
    }

    pub fn ops(&self) -> &FileOperations {
        &self.ops
    }

    /// Scan the root and label its folders. Nothing is cached between calls.
    pub async fn list(&self) -> Result<ListResponse, FileSystemError> {
        let listing = self.ops.scan().await?;
        let cwd = tokio::fs::canonicalize(&self.config.root)
            .await
            .map_err(|e| FileSystemError::IoError {
                message: e.to_string(),
            })?;

        Ok(ListResponse {
            files: listing.files,
            dirs: self.shortcuts.label(listing.dirs),
            cwd: cwd.display().to_string(),
        })
    }
}
