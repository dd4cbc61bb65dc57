use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use shared::{
    domain::{ChunkStatus, LogSeverity, SessionHandle},
    protocol::{StreamEvent, StreamMessage},
};
use tracing::{debug, warn};

/// Largest chunk count that gets per-chunk indicators. Larger announcements
/// keep the count but skip the strip.
pub const MAX_CHUNK_INDICATORS: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub text: String,
    pub severity: LogSeverity,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Open,
    /// A terminal status arrived; the subscription is closed.
    Finished,
    /// The transport dropped before a terminal status.
    Interrupted,
}

/// What a terminal status resolved to, pending the settle delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Transcript(String),
    ServerError(String),
}

/// Progress of one upload's transcription as reported by the server.
#[derive(Debug, Clone)]
pub struct TranscriptionSession {
    pub handle: SessionHandle,
    /// Name of the uploaded file, kept for naming the saved transcript.
    pub source_name: Option<String>,
    pub chunk_count: Option<u32>,
    pub chunks: Vec<ChunkStatus>,
    pub current_chunk: Option<u32>,
    pub partial_texts: BTreeMap<u32, String>,
    pub log: Vec<LogEntry>,
    pub status_text: String,
    pub progress_percent: f64,
    pub phase: StreamPhase,
    pub outcome: Option<Outcome>,
}

impl TranscriptionSession {
    pub fn new(handle: SessionHandle, source_name: Option<String>) -> Self {
        Self {
            handle,
            source_name,
            chunk_count: None,
            chunks: Vec::new(),
            current_chunk: None,
            partial_texts: BTreeMap::new(),
            log: Vec::new(),
            status_text: String::new(),
            progress_percent: 0.0,
            phase: StreamPhase::Open,
            outcome: None,
        }
    }

    pub fn push_log(&mut self, text: impl Into<String>, severity: LogSeverity) {
        self.log.push(LogEntry {
            at: Local::now(),
            text: text.into(),
            severity,
        });
    }

    pub fn set_progress(&mut self, percent: f64) {
        self.progress_percent = percent.clamp(0.0, 100.0);
    }

    /// Folds one stream message into the session. Returns the outcome when the
    /// message is terminal.
    pub fn apply(&mut self, message: StreamMessage) -> Option<Outcome> {
        if let Some(progress) = message.progress.filter(|p| *p > 0.0) {
            self.set_progress(progress);
        }

        match message.event {
            StreamEvent::Converting { message }
            | StreamEvent::Converted { message }
            | StreamEvent::Loading { message }
            | StreamEvent::Splitting { message }
            | StreamEvent::SplittingTime { message } => {
                self.announce(message);
            }
            StreamEvent::Processing {
                message,
                total_chunks,
            } => {
                self.announce(message);
                if self.chunks.is_empty() {
                    self.chunk_count = Some(total_chunks);
                    if total_chunks <= MAX_CHUNK_INDICATORS {
                        self.chunks = vec![ChunkStatus::Pending; total_chunks as usize];
                    } else {
                        warn!(
                            handle = %self.handle,
                            total_chunks,
                            limit = MAX_CHUNK_INDICATORS,
                            "chunk count exceeds indicator limit; skipping per-chunk indicators"
                        );
                    }
                }
            }
            StreamEvent::Transcribing {
                message,
                current_chunk,
                total_chunks,
            } => {
                self.announce(message);
                self.chunk_count.get_or_insert(total_chunks);
                self.current_chunk = Some(current_chunk);
                if self.chunk_status(current_chunk) == Some(ChunkStatus::Pending) {
                    self.mark_chunk(current_chunk, ChunkStatus::Processing);
                }
            }
            StreamEvent::PartialText {
                chunk_number,
                partial_text,
            } => {
                self.push_log(
                    format!(
                        "✓ Chunk {chunk_number} transcribed ({} characters)",
                        partial_text.chars().count()
                    ),
                    LogSeverity::Info,
                );
                self.partial_texts.insert(chunk_number, partial_text);
                self.mark_chunk(chunk_number, ChunkStatus::Success);
            }
            StreamEvent::ChunkError {
                current_chunk,
                message,
            }
            | StreamEvent::RetryFailed {
                current_chunk,
                message,
            } => {
                if let Some(chunk) = current_chunk.or(self.current_chunk) {
                    self.mark_chunk(chunk, ChunkStatus::Error);
                }
                self.push_log(message, LogSeverity::Error);
            }
            StreamEvent::RetrySuccess {
                chunk_number,
                partial_text,
            } => {
                self.partial_texts.insert(chunk_number, partial_text);
                self.mark_chunk(chunk_number, ChunkStatus::Retried);
                self.push_log(
                    format!("↻ Retry succeeded for chunk {chunk_number}"),
                    LogSeverity::Info,
                );
            }
            StreamEvent::Completed { full_text } => {
                self.status_text = "Transcription complete!".to_string();
                self.push_log("✓ Transcription finished successfully", LogSeverity::Success);
                self.phase = StreamPhase::Finished;
                let outcome = Outcome::Transcript(full_text);
                self.outcome = Some(outcome.clone());
                return Some(outcome);
            }
            StreamEvent::Error { message, trace } => {
                if let Some(trace) = trace {
                    debug!(handle = %self.handle, %trace, "server attached a trace to its error");
                }
                self.status_text = "Transcription failed".to_string();
                self.push_log(message.clone(), LogSeverity::Error);
                self.phase = StreamPhase::Finished;
                let outcome = Outcome::ServerError(message);
                self.outcome = Some(outcome.clone());
                return Some(outcome);
            }
            StreamEvent::Unknown => {
                debug!(handle = %self.handle, "ignoring progress event with unknown status");
            }
        }
        None
    }

    pub fn interrupt(&mut self, message: &str) {
        self.phase = StreamPhase::Interrupted;
        self.push_log(message, LogSeverity::Error);
    }

    pub fn chunk_status(&self, chunk_number: u32) -> Option<ChunkStatus> {
        let index = (chunk_number as usize).checked_sub(1)?;
        self.chunks.get(index).copied()
    }

    /// Partial results joined in chunk order.
    pub fn partial_transcript(&self) -> String {
        self.partial_texts
            .values()
            .map(String::as_str)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn announce(&mut self, message: String) {
        self.status_text = message.clone();
        self.push_log(message, LogSeverity::Info);
    }

    fn mark_chunk(&mut self, chunk_number: u32, status: ChunkStatus) {
        let Some(index) = (chunk_number as usize).checked_sub(1) else {
            return;
        };
        if let Some(slot) = self.chunks.get_mut(index) {
            *slot = status;
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
