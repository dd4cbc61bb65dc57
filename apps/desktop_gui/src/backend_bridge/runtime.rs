//! Runtime bridge between UI command queue and backend event intake.

use std::thread;

use client_core::{
    config::Settings, export::save_transcript, ControllerEvent, EffectRunner, EventSink,
    TranscriptionClient,
};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Forwards controller events produced on the runtime to the UI queue.
#[derive(Clone)]
pub struct UiEventSink {
    ui_tx: Sender<UiEvent>,
}

impl UiEventSink {
    pub fn new(ui_tx: Sender<UiEvent>) -> Self {
        Self { ui_tx }
    }
}

impl EventSink for UiEventSink {
    fn deliver(&self, event: ControllerEvent) {
        if self.ui_tx.send(UiEvent::Controller(event)).is_err() {
            tracing::debug!("ui event queue closed");
        }
    }
}

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match TranscriptionClient::new(&settings.server_url) {
                Ok(client) => client.with_upload_timeout(settings.request_timeout()),
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("{err:#}"),
                    )));
                    tracing::error!(server_url = %settings.server_url, "invalid server url: {err:#}");
                    return;
                }
            };
            let mut runner = EffectRunner::new(client, UiEventSink::new(ui_tx.clone()));
            tracing::info!(server_url = %settings.server_url, "backend worker ready");
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Ready. Transcription server: {}",
                settings.server_url
            )));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Apply(effects) => runner.apply_all(effects),
                    BackendCommand::SaveTranscript {
                        target,
                        source_name,
                        text,
                    } => {
                        let event =
                            match save_transcript(&target, source_name.as_deref(), &text).await {
                                Ok(path) => UiEvent::TranscriptSaved(path),
                                Err(err) => UiEvent::Error(UiError::from_message(
                                    UiErrorContext::SaveTranscript,
                                    format!("{err:#}"),
                                )),
                            };
                        let _ = ui_tx.try_send(event);
                    }
                }
            }
            tracing::info!("backend command queue closed; worker exiting");
        });
    });
}
