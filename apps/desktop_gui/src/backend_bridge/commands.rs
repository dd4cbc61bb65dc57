//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use client_core::Effect;

pub enum BackendCommand {
    /// Side effects returned by the controller, executed in order.
    Apply(Vec<Effect>),
    SaveTranscript {
        target: PathBuf,
        source_name: Option<String>,
        text: String,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Apply(_) => "apply_effects",
            BackendCommand::SaveTranscript { .. } => "save_transcript",
        }
    }
}
