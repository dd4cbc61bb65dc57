use super::*;

use std::path::PathBuf;

use shared::{
    domain::SessionHandle,
    error::{StreamError, UploadError},
    protocol::{StreamEvent, StreamMessage},
};

use crate::{controller::ControllerEvent, staging::LocalFile};

fn stage(controller: &mut Controller, name: &str, size_bytes: u64) {
    controller.dispatch(ControllerEvent::Stage(LocalFile {
        path: PathBuf::from(name),
        name: name.to_string(),
        size_bytes,
        mime: Some("audio/mpeg".to_string()),
    }));
}

fn start_streaming(controller: &mut Controller) -> u64 {
    stage(controller, "talk.mp3", 10 * 1024 * 1024);
    controller.dispatch(ControllerEvent::StartUpload);
    let ticket = controller.ticket();
    controller.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Ok(SessionHandle("talk.mp3".to_string())),
    });
    ticket
}

#[test]
fn idle_shows_only_the_drop_zone() {
    let model = ViewModel::project(&Controller::default());
    assert_eq!(model.panel, Panel::None);
    assert!(model.drop_zone_enabled);
    assert_eq!(model.visible_panels(), 0);
    assert_eq!(model.download_name, "transcripcion.txt");
}

#[test]
fn staged_file_shows_size_and_advisory() {
    let mut controller = Controller::default();
    stage(&mut controller, "talk.mp3", 10 * 1024 * 1024);
    let model = ViewModel::project(&controller);
    assert_eq!(model.panel, Panel::FileInfo);
    let info = model.file_info.expect("file info");
    assert_eq!(info.size_text, "10 MB");
    assert!(info.advisory.expect("advisory").contains("about 7 min"));
}

#[test]
fn uploading_shows_progress_with_cancel() {
    let mut controller = Controller::default();
    stage(&mut controller, "talk.mp3", 1024);
    controller.dispatch(ControllerEvent::StartUpload);
    let model = ViewModel::project(&controller);
    assert_eq!(model.panel, Panel::Progress);
    assert!(!model.drop_zone_enabled);
    let progress = model.progress.expect("progress");
    assert_eq!(progress.status_text, "Uploading file...");
    assert_eq!(progress.action, ProgressAction::Cancel);
}

#[test]
fn streaming_projects_counter_indicators_and_preview() {
    let mut controller = Controller::default();
    let ticket = start_streaming(&mut controller);
    for event in [
        StreamEvent::Processing {
            message: "Audio split into 2 chunks".to_string(),
            total_chunks: 2,
        },
        StreamEvent::Transcribing {
            message: "Transcribing chunk 1/2".to_string(),
            current_chunk: 1,
            total_chunks: 2,
        },
        StreamEvent::PartialText {
            chunk_number: 1,
            partial_text: "hola".to_string(),
        },
    ] {
        controller.dispatch(ControllerEvent::Stream {
            ticket,
            message: StreamMessage::new(event),
        });
    }

    let model = ViewModel::project(&controller);
    assert_eq!(model.visible_panels(), 1);
    let progress = model.progress.expect("progress");
    assert_eq!(progress.counter_text().as_deref(), Some("Chunk progress: 1/2"));
    assert_eq!(
        progress.indicators,
        vec![ChunkStatus::Success, ChunkStatus::Pending]
    );
    assert_eq!(progress.preview, "hola");
    assert!(progress.log.iter().all(|line| line.text.starts_with('[')));
}

#[test]
fn oversized_chunk_count_still_shows_the_counter() {
    let mut controller = Controller::default();
    let ticket = start_streaming(&mut controller);
    controller.dispatch(ControllerEvent::Stream {
        ticket,
        message: StreamMessage::new(StreamEvent::Processing {
            message: "Audio split into many chunks".to_string(),
            total_chunks: u32::MAX,
        }),
    });

    let progress = ViewModel::project(&controller).progress.expect("progress");
    assert_eq!(
        progress.counter_text(),
        Some(format!("Chunk progress: 0/{}", u32::MAX))
    );
    assert!(progress.indicators.is_empty());
}

#[test]
fn dropped_stream_offers_back_instead_of_cancel() {
    let mut controller = Controller::default();
    let ticket = start_streaming(&mut controller);
    controller.dispatch(ControllerEvent::StreamFailed {
        ticket,
        error: StreamError::Transport("reset by peer".to_string()),
    });
    let progress = ViewModel::project(&controller).progress.expect("progress");
    assert_eq!(progress.action, ProgressAction::Back);
    assert_eq!(
        progress.log.last().map(|line| line.severity),
        Some(LogSeverity::Error)
    );
}

#[test]
fn completed_shows_only_results() {
    let mut controller = Controller::default();
    let ticket = start_streaming(&mut controller);
    controller.dispatch(ControllerEvent::Stream {
        ticket,
        message: StreamMessage::new(StreamEvent::Completed {
            full_text: "hola mundo".to_string(),
        }),
    });
    assert_eq!(
        ViewModel::project(&controller).progress.map(|p| p.action),
        Some(ProgressAction::None)
    );

    controller.dispatch(ControllerEvent::Settle { ticket });
    let model = ViewModel::project(&controller);
    assert_eq!(model.panel, Panel::Results);
    assert_eq!(model.visible_panels(), 1);
    assert_eq!(model.transcript.as_deref(), Some("hola mundo"));
    assert_eq!(model.download_name, "talk-transcripcion.txt");
}

#[test]
fn failure_shows_only_error_and_reset_clears_everything() {
    let mut controller = Controller::default();
    stage(&mut controller, "talk.mp3", 10 * 1024 * 1024);
    controller.dispatch(ControllerEvent::StartUpload);
    let ticket = controller.ticket();
    controller.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Err(UploadError::ServerReported("No file was sent".to_string())),
    });

    let model = ViewModel::project(&controller);
    assert_eq!(model.panel, Panel::Error);
    assert!(model.drop_zone_enabled);
    assert_eq!(model.visible_panels(), 1);
    assert_eq!(model.error.map(|e| e.message).as_deref(), Some("No file was sent"));

    controller.dispatch(ControllerEvent::Reset);
    let model = ViewModel::project(&controller);
    assert_eq!(model.panel, Panel::None);
    assert_eq!(model.visible_panels(), 0);
    assert!(model.file_info.is_none());
    assert!(model.progress.is_none());
}
