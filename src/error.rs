//! Error types
//!
//! File-level errors are translated into HTTP statuses at the responder
//! boundary; nothing in this crate retries.

use std::io;
use thiserror::Error;

/// Failure to serve a file from disk
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("file not found")]
    NotFound,
    /// Path names a directory; answered with a trailing-slash redirect
    #[error("path is a directory")]
    IsDirectory,
    #[error("permission denied")]
    Forbidden,
    #[error("failed to open file: {0}")]
    OpenFailure(#[source] io::Error),
}

impl ServeError {
    /// Classify an error returned while opening or stat-ing a file
    pub fn from_open(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::OpenFailure(err),
        }
    }
}

/// Failure reported by the download pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no stream known for name '{0}'")]
    UnknownName(String),
    #[error("download pipeline unavailable: {0}")]
    Unavailable(String),
}

/// Failure while relocating an uploaded file
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("missing form field '{0}'")]
    MissingField(&'static str),
    #[error("invalid file name '{0}'")]
    InvalidName(String),
    #[error("failed to stage upload: {0}")]
    Stage(#[source] io::Error),
    #[error("failed to move upload into place: {0}")]
    Move(#[source] io::Error),
}
