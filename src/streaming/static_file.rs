use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;

use crate::filesystem::mime;
use crate::protocol::FileSystemError;

use super::range::{self, ByteRange, RangeOutcome};

const CHUNK_SIZE: usize = 64 * 1024;

/// An open regular file, served whole
pub struct StaticFile {
    path: PathBuf,
    file: File,
    length: u64,
    modified: Option<SystemTime>,
    content_type: String,
}

impl StaticFile {
    pub async fn open(path: &Path) -> Result<Self, FileSystemError> {
        let file = File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileSystemError::NotFound {
                path: path.display().to_string(),
            },
            _ => FileSystemError::IoError {
                message: e.to_string(),
            },
        })?;
        let metadata = file.metadata().await.map_err(|e| FileSystemError::IoError {
            message: e.to_string(),
        })?;

        if !metadata.is_file() {
            return Err(FileSystemError::NotAFile {
                path: path.display().to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            length: metadata.len(),
            modified: metadata.modified().ok(),
            content_type: mime::detect_mime_type(path),
        })
    }

    /// Length captured when the file was opened
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// `Content-Type`, `Accept-Ranges` and `Last-Modified`
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&self.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Some(value) = self
            .modified
            .map(httpdate::fmt_http_date)
            .and_then(|date| HeaderValue::from_str(&date).ok())
        {
            headers.insert(header::LAST_MODIFIED, value);
        }
        headers
    }

    /// 200 with the whole file
    pub fn into_response(self) -> Response {
        let length = self.length;
        self.stream(StatusCode::OK, length, HeaderMap::new())
    }

    /// 206 with exactly `range.length()` bytes starting at `range.start`
    pub async fn into_range_response(mut self, range: ByteRange) -> Result<Response, FileSystemError> {
        self.file
            .seek(SeekFrom::Start(range.start))
            .await
            .map_err(|e| FileSystemError::IoError {
                message: e.to_string(),
            })?;

        let mut extra = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&range.content_range(self.length)) {
            extra.insert(header::CONTENT_RANGE, value);
        }
        Ok(self.stream(StatusCode::PARTIAL_CONTENT, range.length(), extra))
    }

    /// 416 with `Content-Range: bytes */<length>` and no body
    pub fn unsatisfiable_response(&self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", self.length)) {
            headers.insert(header::CONTENT_RANGE, value);
        }
        (StatusCode::RANGE_NOT_SATISFIABLE, headers, Body::empty()).into_response()
    }

    fn stream(self, status: StatusCode, length: u64, extra: HeaderMap) -> Response {
        let mut headers = self.headers();
        headers.extend(extra);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

        // `take` keeps the read from running past the negotiated end even
        // though the underlying file continues.
        let body = TransferStream {
            inner: ReaderStream::with_capacity(self.file.take(length), CHUNK_SIZE),
            path: self.path,
            expected: length,
            sent: 0,
        };
        (status, headers, Body::from_stream(body)).into_response()
    }
}

/// Wraps a [`StaticFile`] and rewrites its body into a slice when the
/// request carries a usable `Range` header
pub struct RangeNegotiator<'a> {
    range: Option<&'a str>,
    if_range: Option<&'a str>,
}

impl<'a> RangeNegotiator<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        Self {
            range: headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
            if_range: headers.get(header::IF_RANGE).and_then(|v| v.to_str().ok()),
        }
    }

    pub async fn respond(&self, file: StaticFile) -> Result<Response, FileSystemError> {
        let requested = if self.if_range_matches(file.modified()) {
            self.range
        } else {
            None
        };

        match range::negotiate(requested, file.length()) {
            RangeOutcome::Full => Ok(file.into_response()),
            RangeOutcome::Partial(range) => {
                tracing::debug!(
                    path = %file.path.display(),
                    start = range.start,
                    end = range.end,
                    length = range.length(),
                    "range request accepted"
                );
                file.into_range_response(range).await
            }
            RangeOutcome::Unsatisfiable => {
                tracing::debug!(
                    path = %file.path.display(),
                    range = self.range.unwrap_or_default(),
                    size = file.length(),
                    "range not satisfiable"
                );
                Ok(file.unsatisfiable_response())
            }
        }
    }

    /// `If-Range` only carries dates here since no ETags are issued; an
    /// entity tag never matches.
    fn if_range_matches(&self, modified: Option<SystemTime>) -> bool {
        let Some(value) = self.if_range else {
            return true;
        };
        match (httpdate::parse_http_date(value), modified) {
            (Ok(date), Some(modified)) => unix_seconds(modified) <= unix_seconds(date),
            _ => false,
        }
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Response body that logs when the client goes away early. Dropping it
/// closes the file.
struct TransferStream {
    inner: ReaderStream<Take<File>>,
    path: PathBuf,
    expected: u64,
    sent: u64,
}

impl Stream for TransferStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            this.sent += chunk.len() as u64;
        }
        polled
    }
}

impl Drop for TransferStream {
    fn drop(&mut self) {
        if self.sent < self.expected {
            tracing::debug!(
                "Client stopped reading {} after {}/{} bytes",
                self.path.display(),
                self.sent,
                self.expected
            );
        }
    }
}
