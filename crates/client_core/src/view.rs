//! Pure projection of controller state into what a front end should show.

use shared::{
    domain::{ChunkStatus, LogSeverity, ViewState},
    error::ErrorKind,
};

use crate::{controller::Controller, session::StreamPhase};

const UPLOAD_STATUS_TEXT: &str = "Uploading file...";
const UPLOAD_PROGRESS_PERCENT: f64 = 5.0;

/// The one content panel visible next to the drop zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    None,
    FileInfo,
    Progress,
    Results,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    None,
    Cancel,
    /// Offered once the stream dropped; leads back to idle.
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileInfoView {
    pub name: String,
    pub size_text: String,
    pub advisory: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub text: String,
    pub severity: LogSeverity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub status_text: String,
    pub percent: f64,
    /// `(current, total)` chunk counter once the server announced chunks.
    pub chunk_counter: Option<(u32, u32)>,
    pub indicators: Vec<ChunkStatus>,
    pub log: Vec<LogLine>,
    pub preview: String,
    pub action: ProgressAction,
}

impl ProgressView {
    pub fn counter_text(&self) -> Option<String> {
        self.chunk_counter
            .map(|(current, total)| format!("Chunk progress: {current}/{total}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub state: ViewState,
    pub panel: Panel,
    pub drop_zone_enabled: bool,
    pub file_info: Option<FileInfoView>,
    pub progress: Option<ProgressView>,
    pub transcript: Option<String>,
    pub download_name: String,
    pub error: Option<ErrorView>,
}

impl ViewModel {
    pub fn project(controller: &Controller) -> Self {
        let state = controller.state();
        let mut model = Self {
            state,
            panel: Panel::None,
            drop_zone_enabled: state.accepts_selection(),
            file_info: None,
            progress: None,
            transcript: None,
            download_name: controller.download_name(),
            error: None,
        };

        match state {
            ViewState::Idle => {}
            ViewState::FileStaged => {
                model.panel = Panel::FileInfo;
                model.file_info = controller.staged().map(|file| FileInfoView {
                    name: file.name.clone(),
                    size_text: file.size_text(),
                    advisory: controller.advisory().map(|advisory| advisory.message()),
                });
            }
            ViewState::Uploading => {
                model.panel = Panel::Progress;
                model.progress = Some(ProgressView {
                    status_text: UPLOAD_STATUS_TEXT.to_string(),
                    percent: UPLOAD_PROGRESS_PERCENT,
                    chunk_counter: None,
                    indicators: Vec::new(),
                    log: Vec::new(),
                    preview: String::new(),
                    action: ProgressAction::Cancel,
                });
            }
            ViewState::Streaming => {
                model.panel = Panel::Progress;
                model.progress = controller.session().map(|session| ProgressView {
                    status_text: session.status_text.clone(),
                    percent: session.progress_percent,
                    chunk_counter: session
                        .chunk_count
                        .map(|total| (session.current_chunk.unwrap_or(0), total)),
                    indicators: session.chunks.clone(),
                    log: session
                        .log
                        .iter()
                        .map(|entry| LogLine {
                            text: entry.render(),
                            severity: entry.severity,
                        })
                        .collect(),
                    preview: session.partial_transcript(),
                    action: match session.phase {
                        StreamPhase::Open => ProgressAction::Cancel,
                        StreamPhase::Finished => ProgressAction::None,
                        StreamPhase::Interrupted => ProgressAction::Back,
                    },
                });
            }
            ViewState::Completed => {
                model.panel = Panel::Results;
                model.transcript = controller.transcript().map(str::to_string);
            }
            ViewState::Failed => {
                model.panel = Panel::Error;
                model.error = controller.failure().map(|failure| ErrorView {
                    kind: failure.kind,
                    message: failure.message.clone(),
                });
            }
        }
        model
    }

    /// Number of content panels with data to show; never more than one.
    pub fn visible_panels(&self) -> usize {
        [
            self.file_info.is_some(),
            self.progress.is_some(),
            self.transcript.is_some(),
            self.error.is_some(),
        ]
        .into_iter()
        .filter(|visible| *visible)
        .count()
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
