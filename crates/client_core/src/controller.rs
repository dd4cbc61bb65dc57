//! Upload/progress state machine.
//!
//! [`Controller::dispatch`] takes one event (a user intent or a network
//! outcome), advances the view state and returns the side effects a driver
//! must perform. The controller itself never touches the network, so every
//! transition can be exercised synchronously.

use std::time::Duration;

use shared::{
    domain::{LogSeverity, SessionHandle, ViewState},
    error::{ErrorKind, StreamError, UploadError, STREAM_LOST_MESSAGE},
    protocol::StreamMessage,
};
use tracing::{debug, info, warn};

use crate::{
    export::transcript_file_name,
    session::{Outcome, StreamPhase, TranscriptionSession},
    staging::{stage, Advisory, LocalFile, StagedFile},
};

/// Delay between a terminal status and leaving the progress panel.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Identifies one upload attempt. Network outcomes carry the ticket of the
/// attempt that produced them; outcomes for a superseded attempt are dropped.
pub type Ticket = u64;

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Stage(LocalFile),
    StartUpload,
    UploadFinished {
        ticket: Ticket,
        result: Result<SessionHandle, UploadError>,
    },
    Stream {
        ticket: Ticket,
        message: StreamMessage,
    },
    StreamFailed {
        ticket: Ticket,
        error: StreamError,
    },
    Settle {
        ticket: Ticket,
    },
    Cancel,
    Retry,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Upload { ticket: Ticket, file: StagedFile },
    OpenStream { ticket: Ticket, handle: SessionHandle },
    CloseStream,
    ScheduleSettle { ticket: Ticket, after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug)]
pub struct Controller {
    state: ViewState,
    staged: Option<StagedFile>,
    advisory: Option<Advisory>,
    session: Option<TranscriptionSession>,
    failure: Option<Failure>,
    ticket: Ticket,
    stream_open: bool,
    settle_delay: Duration,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl Controller {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: ViewState::Idle,
            staged: None,
            advisory: None,
            session: None,
            failure: None,
            ticket: 0,
            stream_open: false,
            settle_delay,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn staged(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    pub fn advisory(&self) -> Option<Advisory> {
        self.advisory
    }

    pub fn session(&self) -> Option<&TranscriptionSession> {
        self.session.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn has_open_stream(&self) -> bool {
        self.stream_open
    }

    /// Final transcript, available once the view reached `Completed`.
    pub fn transcript(&self) -> Option<&str> {
        if self.state != ViewState::Completed {
            return None;
        }
        match self.session.as_ref()?.outcome.as_ref()? {
            Outcome::Transcript(text) => Some(text),
            Outcome::ServerError(_) => None,
        }
    }

    /// File name offered when saving the transcript.
    pub fn download_name(&self) -> String {
        let source = self
            .session
            .as_ref()
            .and_then(|session| session.source_name.as_deref())
            .or_else(|| self.staged.as_ref().map(|file| file.name.as_str()));
        transcript_file_name(source)
    }

    pub fn dispatch(&mut self, event: ControllerEvent) -> Vec<Effect> {
        match event {
            ControllerEvent::Stage(file) => self.on_stage(file),
            ControllerEvent::StartUpload => self.on_start_upload(),
            ControllerEvent::UploadFinished { ticket, result } => {
                self.on_upload_finished(ticket, result)
            }
            ControllerEvent::Stream { ticket, message } => self.on_stream(ticket, message),
            ControllerEvent::StreamFailed { ticket, error } => {
                self.on_stream_failed(ticket, error)
            }
            ControllerEvent::Settle { ticket } => self.on_settle(ticket),
            ControllerEvent::Cancel => {
                if matches!(self.state, ViewState::Uploading | ViewState::Streaming) {
                    info!(ticket = self.ticket, "processing cancelled by user");
                }
                self.reset()
            }
            ControllerEvent::Retry => self.on_retry(),
            ControllerEvent::Reset => self.reset(),
        }
    }

    fn on_stage(&mut self, file: LocalFile) -> Vec<Effect> {
        if !self.state.accepts_selection() {
            warn!(state = ?self.state, name = %file.name, "ignoring file selection while busy");
            return Vec::new();
        }

        self.session = None;
        self.failure = None;
        self.advisory = None;
        match stage(file) {
            Ok(staged) => {
                self.advisory = staged.advisory();
                self.staged = Some(staged);
                self.transition(ViewState::FileStaged);
            }
            Err(err) => {
                warn!(error = ?err, "rejected file selection");
                self.staged = None;
                self.failure = Some(Failure {
                    kind: ErrorKind::Validation,
                    message: err.to_string(),
                });
                self.transition(ViewState::Failed);
            }
        }
        Vec::new()
    }

    fn on_start_upload(&mut self) -> Vec<Effect> {
        if self.state != ViewState::FileStaged {
            return Vec::new();
        }
        let Some(file) = self.staged.clone() else {
            return Vec::new();
        };

        self.ticket += 1;
        self.advisory = None;
        self.transition(ViewState::Uploading);
        vec![Effect::Upload {
            ticket: self.ticket,
            file,
        }]
    }

    fn on_upload_finished(
        &mut self,
        ticket: Ticket,
        result: Result<SessionHandle, UploadError>,
    ) -> Vec<Effect> {
        if ticket != self.ticket || self.state != ViewState::Uploading {
            debug!(ticket, current = self.ticket, "dropping stale upload result");
            return Vec::new();
        }

        match result {
            Ok(handle) => {
                let source_name = self.staged.take().map(|file| file.name);
                let mut session = TranscriptionSession::new(handle.clone(), source_name);
                session.status_text = "Starting transcription...".to_string();
                session.set_progress(5.0);
                session.push_log("Starting transcription process...", LogSeverity::Info);
                self.session = Some(session);
                self.transition(ViewState::Streaming);

                let mut effects = Vec::new();
                if self.stream_open {
                    effects.push(Effect::CloseStream);
                }
                self.stream_open = true;
                effects.push(Effect::OpenStream { ticket, handle });
                effects
            }
            Err(err) => {
                warn!(error = %err, detail = err.detail(), "upload failed");
                self.failure = Some(Failure {
                    kind: err.kind(),
                    message: err.to_string(),
                });
                self.transition(ViewState::Failed);
                Vec::new()
            }
        }
    }

    fn on_stream(&mut self, ticket: Ticket, message: StreamMessage) -> Vec<Effect> {
        let Some(session) = self.live_session(ticket) else {
            debug!(ticket, "dropping progress event for inactive stream");
            return Vec::new();
        };

        debug!(ticket, status = message.event.status(), "progress event");
        let Some(outcome) = session.apply(message) else {
            return Vec::new();
        };

        match &outcome {
            Outcome::Transcript(text) => {
                info!(ticket, characters = text.chars().count(), "transcription completed")
            }
            Outcome::ServerError(message) => {
                warn!(ticket, %message, "server reported transcription error")
            }
        }
        self.stream_open = false;
        vec![
            Effect::CloseStream,
            Effect::ScheduleSettle {
                ticket,
                after: self.settle_delay,
            },
        ]
    }

    fn on_stream_failed(&mut self, ticket: Ticket, error: StreamError) -> Vec<Effect> {
        let Some(session) = self.live_session(ticket) else {
            return Vec::new();
        };

        warn!(
            ticket,
            handle = %session.handle,
            kind = ?error.kind(),
            %error,
            "progress stream dropped"
        );
        session.interrupt(STREAM_LOST_MESSAGE);
        self.stream_open = false;
        vec![Effect::CloseStream]
    }

    fn on_settle(&mut self, ticket: Ticket) -> Vec<Effect> {
        if ticket != self.ticket || self.state != ViewState::Streaming {
            return Vec::new();
        }
        let Some(outcome) = self.session.as_ref().and_then(|s| s.outcome.clone()) else {
            return Vec::new();
        };

        match outcome {
            Outcome::Transcript(_) => self.transition(ViewState::Completed),
            Outcome::ServerError(message) => {
                self.failure = Some(Failure {
                    kind: ErrorKind::ServerReported,
                    message,
                });
                self.transition(ViewState::Failed);
            }
        }
        Vec::new()
    }

    fn on_retry(&mut self) -> Vec<Effect> {
        if self.state != ViewState::Failed {
            return Vec::new();
        }
        if self.staged.is_some() {
            self.failure = None;
            self.session = None;
            self.advisory = self.staged.as_ref().and_then(StagedFile::advisory);
            self.transition(ViewState::FileStaged);
            return Vec::new();
        }
        self.reset()
    }

    /// Returns to `Idle` from any state, releasing the subscription and every
    /// piece of staged or session data.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.stream_open {
            effects.push(Effect::CloseStream);
            self.stream_open = false;
        }
        if self.state != ViewState::Idle {
            // Invalidate whatever is still in flight for the abandoned attempt.
            self.ticket += 1;
        }
        self.staged = None;
        self.advisory = None;
        self.session = None;
        self.failure = None;
        self.transition(ViewState::Idle);
        effects
    }

    fn live_session(&mut self, ticket: Ticket) -> Option<&mut TranscriptionSession> {
        if ticket != self.ticket || self.state != ViewState::Streaming {
            return None;
        }
        self.session
            .as_mut()
            .filter(|session| session.phase == StreamPhase::Open)
    }

    fn transition(&mut self, next: ViewState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "view state transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
