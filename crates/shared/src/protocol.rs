use serde::{Deserialize, Serialize};

use crate::{domain::SessionHandle, error::UploadError};

/// Multipart field carrying the audio payload on `POST /upload`.
pub const UPLOAD_FIELD: &str = "file";

/// Body of the `POST /upload` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn accepted(filename: impl Into<String>) -> Self {
        Self {
            success: true,
            filename: Some(filename.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: None,
            error: Some(error.into()),
        }
    }

    pub fn into_handle(self) -> Result<SessionHandle, UploadError> {
        if !self.success {
            return Err(UploadError::ServerReported(
                self.error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }
        match self.filename {
            Some(filename) if !filename.is_empty() => Ok(SessionHandle(filename)),
            _ => Err(UploadError::Connectivity(
                "upload accepted without a filename".to_string(),
            )),
        }
    }
}

/// One message of the `GET /transcribe/{filename}` event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(flatten)]
    pub event: StreamEvent,
}

impl StreamMessage {
    pub fn new(event: StreamEvent) -> Self {
        Self {
            progress: None,
            event,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.event.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamEvent {
    Converting {
        #[serde(default)]
        message: String,
    },
    Converted {
        #[serde(default)]
        message: String,
    },
    Loading {
        #[serde(default)]
        message: String,
    },
    Splitting {
        #[serde(default)]
        message: String,
    },
    SplittingTime {
        #[serde(default)]
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Processing {
        #[serde(default)]
        message: String,
        total_chunks: u32,
    },
    #[serde(rename_all = "camelCase")]
    Transcribing {
        #[serde(default)]
        message: String,
        current_chunk: u32,
        total_chunks: u32,
    },
    #[serde(rename_all = "camelCase")]
    PartialText {
        chunk_number: u32,
        partial_text: String,
    },
    #[serde(rename_all = "camelCase")]
    ChunkError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_chunk: Option<u32>,
        #[serde(default)]
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RetrySuccess {
        chunk_number: u32,
        partial_text: String,
    },
    #[serde(rename_all = "camelCase")]
    RetryFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_chunk: Option<u32>,
        #[serde(default)]
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed { full_text: String },
    Error {
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed { .. } | StreamEvent::Error { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            StreamEvent::Converting { .. } => "converting",
            StreamEvent::Converted { .. } => "converted",
            StreamEvent::Loading { .. } => "loading",
            StreamEvent::Splitting { .. } => "splitting",
            StreamEvent::SplittingTime { .. } => "splitting_time",
            StreamEvent::Processing { .. } => "processing",
            StreamEvent::Transcribing { .. } => "transcribing",
            StreamEvent::PartialText { .. } => "partial_text",
            StreamEvent::ChunkError { .. } => "chunk_error",
            StreamEvent::RetrySuccess { .. } => "retry_success",
            StreamEvent::RetryFailed { .. } => "retry_failed",
            StreamEvent::Completed { .. } => "completed",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_chunk_fields() {
        let message: StreamMessage = serde_json::from_str(
            r#"{"status":"transcribing","message":"Chunk 2/5","currentChunk":2,"totalChunks":5,"progress":42}"#,
        )
        .expect("decode");
        assert_eq!(message.progress, Some(42.0));
        assert_eq!(
            message.event,
            StreamEvent::Transcribing {
                message: "Chunk 2/5".to_string(),
                current_chunk: 2,
                total_chunks: 5,
            }
        );
    }

    #[test]
    fn unknown_status_decodes_as_unknown() {
        let message: StreamMessage =
            serde_json::from_str(r#"{"status":"warming_up","message":"hi","progress":3}"#)
                .expect("decode");
        assert_eq!(message.event, StreamEvent::Unknown);
        assert!(!message.is_terminal());
    }

    #[test]
    fn chunk_error_tolerates_missing_chunk_index() {
        let message: StreamMessage =
            serde_json::from_str(r#"{"status":"chunk_error","message":"unintelligible"}"#)
                .expect("decode");
        assert_eq!(
            message.event,
            StreamEvent::ChunkError {
                current_chunk: None,
                message: "unintelligible".to_string(),
            }
        );
    }

    #[test]
    fn rejected_upload_without_message_uses_generic_text() {
        let err = UploadResponse {
            success: false,
            filename: None,
            error: None,
        }
        .into_handle()
        .expect_err("must fail");
        assert_eq!(err, UploadError::ServerReported("Upload failed".to_string()));
    }

    #[test]
    fn accepted_upload_yields_handle() {
        let handle = UploadResponse::accepted("talk.mp3")
            .into_handle()
            .expect("handle");
        assert_eq!(handle.as_str(), "talk.mp3");
    }
}
