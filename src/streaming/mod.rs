//! Range-aware file streaming for seekable playback

pub mod range;
pub mod static_file;

use std::path::Path;

use axum::http::HeaderMap;
use axum::response::Response;

use crate::protocol::FileSystemError;

pub use static_file::{RangeNegotiator, StaticFile};

/// Serve a file on disk, honouring `Range` and `If-Range`
pub async fn serve_file(path: &Path, headers: &HeaderMap) -> Result<Response, FileSystemError> {
    let file = StaticFile::open(path).await?;
    RangeNegotiator::from_headers(headers).respond(file).await
}

/// Whether a connection error only means the client hung up (seeking in a
/// video cancels the previous request all the time)
pub fn is_connection_noise(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
            if let Some(inner) = io.get_ref() {
                if is_connection_noise(inner) {
                    return true;
                }
            }
        }
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_canceled() {
                return true;
            }
        }
        current = err.source();
    }
    false
}
