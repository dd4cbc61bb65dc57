//! UI/backend events and error modeling for the desktop GUI.

use std::path::PathBuf;

use client_core::ControllerEvent;

pub enum UiEvent {
    Info(String),
    /// A network outcome to feed back into the transcription controller.
    Controller(ControllerEvent),
    TranscriptSaved(PathBuf),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Storage,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    SelectFile,
    SaveTranscript,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid")
            || message_lower.contains("unsupported")
            || message_lower.contains("too large")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("permission denied")
            || message_lower.contains("no such file")
            || message_lower.contains("failed to write")
            || message_lower.contains("failed to read")
            || message_lower.contains("read-only")
        {
            UiErrorCategory::Storage
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("disconnected")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-line text for the status bar.
    pub fn status_text(&self) -> String {
        let prefix = match self.context {
            UiErrorContext::BackendStartup => "Backend worker startup failure",
            UiErrorContext::SelectFile => "Could not open file",
            UiErrorContext::SaveTranscript => "Could not save transcript",
            UiErrorContext::General => "Error",
        };
        format!("{prefix}: {}", self.message)
    }
}
