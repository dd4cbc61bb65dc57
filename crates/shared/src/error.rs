use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MAX_UPLOAD_BYTES;

/// Generic text shown for any upload transport failure.
pub const CONNECTIVITY_MESSAGE: &str =
    "Connection error. Check your network connection and try again.";

/// Log line appended when the progress stream drops before a terminal status.
pub const STREAM_LOST_MESSAGE: &str = "Connection lost. The transcription may be incomplete.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connectivity,
    Stream,
    ServerReported,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unsupported file type. Please upload a WAV, MP3, OGG, FLAC or M4A audio file.")]
    UnsupportedType { name: String, mime: Option<String> },
    #[error("The file is too large. The limit is 100MB.")]
    TooLarge { size_bytes: u64 },
}

impl ValidationError {
    pub fn too_large(size_bytes: u64) -> Option<Self> {
        (size_bytes > MAX_UPLOAD_BYTES).then_some(ValidationError::TooLarge { size_bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Transport failure or a body that is not the expected JSON. The detail is
    /// for logs; users see [`CONNECTIVITY_MESSAGE`].
    #[error("{}", CONNECTIVITY_MESSAGE)]
    Connectivity(String),
    #[error("{0}")]
    ServerReported(String),
    #[error("Could not read the selected file ({0}). Please select it again.")]
    LocalRead(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Connectivity(_) => ErrorKind::Connectivity,
            UploadError::ServerReported(_) => ErrorKind::ServerReported,
            UploadError::LocalRead(_) => ErrorKind::Validation,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            UploadError::Connectivity(detail)
            | UploadError::ServerReported(detail)
            | UploadError::LocalRead(detail) => detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("failed to reach progress stream: {0}")]
    Transport(String),
    #[error("progress stream answered with HTTP {status}")]
    Status { status: u16 },
    #[error("progress stream answered with content type {content_type:?}, expected text/event-stream")]
    NotEventStream { content_type: Option<String> },
    #[error("progress stream closed before a terminal status")]
    Closed,
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Stream
    }
}
