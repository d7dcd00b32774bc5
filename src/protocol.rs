//! HTTP API messages
//!
//! Compatible with the video-organizer front end.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/move`.
///
/// Fields are optional so a missing field is reported as a client error
/// instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// Body of `POST /api/delete`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub filename: Option<String>,
}

/// A destination folder offered for sorting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Keyboard shortcut, `null` once every letter and digit is taken
    pub shortcut: Option<char>,
}

/// Response of `POST /api/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<String>,
    pub dirs: Vec<DirectoryEntry>,
    /// Absolute path of the served root
    pub cwd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Body of every failed API call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileSystemError {
    #[error("File not found: {path}")]
    NotFound { path: String },
    #[error("Invalid filename: {attempted_path}")]
    PathTraversal { attempted_path: String },
    #[error("Permission denied for {path}: {reason}")]
    PermissionDenied { path: String, reason: String },
    #[error("Not a file: {path}")]
    NotAFile { path: String },
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },
    #[error("Already exists: {path}")]
    AlreadyExists { path: String },
    #[error("{message}")]
    IoError { message: String },
}
