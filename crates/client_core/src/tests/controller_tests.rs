use super::*;

use std::path::PathBuf;

use shared::{domain::ChunkStatus, protocol::StreamEvent};

fn audio(name: &str, size_bytes: u64) -> LocalFile {
    LocalFile {
        path: PathBuf::from(format!("/tmp/{name}")),
        name: name.to_string(),
        size_bytes,
        mime: None,
    }
}

fn handle(name: &str) -> SessionHandle {
    SessionHandle(name.to_string())
}

/// Drives a controller through staging and a successful upload.
fn streaming_controller() -> (Controller, Ticket) {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("talk.mp3", 2048)));
    let effects = controller.dispatch(ControllerEvent::StartUpload);
    let ticket = match effects.as_slice() {
        [Effect::Upload { ticket, file }] => {
            assert_eq!(file.name, "talk.mp3");
            *ticket
        }
        other => panic!("unexpected effects: {other:?}"),
    };
    let effects = controller.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Ok(handle("talk.mp3")),
    });
    assert_eq!(
        effects,
        vec![Effect::OpenStream {
            ticket,
            handle: handle("talk.mp3"),
        }]
    );
    (controller, ticket)
}

fn stream(controller: &mut Controller, ticket: Ticket, event: StreamEvent) -> Vec<Effect> {
    controller.dispatch(ControllerEvent::Stream {
        ticket,
        message: StreamMessage::new(event),
    })
}

#[test]
fn staging_a_valid_file_moves_to_file_staged() {
    let mut controller = Controller::default();
    let effects = controller.dispatch(ControllerEvent::Stage(audio("memo.wav", 1024)));
    assert!(effects.is_empty());
    assert_eq!(controller.state(), ViewState::FileStaged);
    assert_eq!(controller.staged().map(|f| f.name.as_str()), Some("memo.wav"));
    assert!(controller.advisory().is_none());
}

#[test]
fn restaging_replaces_file_and_clears_advisory() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("long.mp3", 10 * 1024 * 1024)));
    assert!(controller.advisory().is_some());

    controller.dispatch(ControllerEvent::Stage(audio("short.mp3", 1024)));
    assert_eq!(controller.state(), ViewState::FileStaged);
    assert_eq!(controller.staged().map(|f| f.name.as_str()), Some("short.mp3"));
    assert!(controller.advisory().is_none());
}

#[test]
fn restaging_two_long_files_keeps_a_single_advisory() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("a.mp3", 10 * 1024 * 1024)));
    controller.dispatch(ControllerEvent::Stage(audio("b.mp3", 20 * 1024 * 1024)));
    let advisory = controller.advisory().expect("advisory");
    assert_eq!(advisory.estimated_minutes, 15);
    assert_eq!(controller.staged().map(|f| f.name.as_str()), Some("b.mp3"));
}

#[test]
fn invalid_selection_fails_and_discards_previous_file() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("memo.wav", 1024)));
    controller.dispatch(ControllerEvent::Stage(audio("notes.txt", 10)));
    assert_eq!(controller.state(), ViewState::Failed);
    assert!(controller.staged().is_none());
    let failure = controller.failure().expect("failure");
    assert_eq!(failure.kind, ErrorKind::Validation);
    assert!(failure.message.contains("Unsupported file type"));

    controller.dispatch(ControllerEvent::Stage(audio("memo.wav", 1024)));
    assert_eq!(controller.state(), ViewState::FileStaged);
    assert!(controller.failure().is_none());
}

#[test]
fn start_upload_without_staged_file_is_a_no_op() {
    let mut controller = Controller::default();
    assert!(controller.dispatch(ControllerEvent::StartUpload).is_empty());
    assert_eq!(controller.state(), ViewState::Idle);
}

#[test]
fn successful_upload_opens_exactly_one_stream() {
    let (controller, _) = streaming_controller();
    assert_eq!(controller.state(), ViewState::Streaming);
    assert!(controller.has_open_stream());
    assert!(controller.staged().is_none());
    let session = controller.session().expect("session");
    assert_eq!(session.source_name.as_deref(), Some("talk.mp3"));
    assert_eq!(session.progress_percent, 5.0);
}

#[test]
fn server_rejection_is_surfaced_verbatim_and_retry_restages() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("talk.mp3", 2048)));
    controller.dispatch(ControllerEvent::StartUpload);
    let ticket = controller.ticket();
    controller.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Err(UploadError::ServerReported("File type not allowed".to_string())),
    });
    assert_eq!(controller.state(), ViewState::Failed);
    assert_eq!(
        controller.failure().map(|f| f.message.as_str()),
        Some("File type not allowed")
    );
    assert!(controller.session().is_none());

    controller.dispatch(ControllerEvent::Retry);
    assert_eq!(controller.state(), ViewState::FileStaged);
    assert_eq!(controller.staged().map(|f| f.name.as_str()), Some("talk.mp3"));
}

#[test]
fn connectivity_failure_uses_generic_message() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("talk.mp3", 2048)));
    controller.dispatch(ControllerEvent::StartUpload);
    let ticket = controller.ticket();
    controller.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Err(UploadError::Connectivity("connection refused".to_string())),
    });
    let failure = controller.failure().expect("failure");
    assert_eq!(failure.kind, ErrorKind::Connectivity);
    assert_eq!(failure.message, shared::error::CONNECTIVITY_MESSAGE);
}

#[test]
fn stale_upload_result_after_reset_is_ignored() {
    let mut controller = Controller::default();
    controller.dispatch(ControllerEvent::Stage(audio("talk.mp3", 2048)));
    controller.dispatch(ControllerEvent::StartUpload);
    let stale = controller.ticket();
    controller.dispatch(ControllerEvent::Reset);
    controller.dispatch(ControllerEvent::Stage(audio("other.mp3", 2048)));
    controller.dispatch(ControllerEvent::StartUpload);

    let effects = controller.dispatch(ControllerEvent::UploadFinished {
        ticket: stale,
        result: Ok(handle("talk.mp3")),
    });
    assert!(effects.is_empty());
    assert_eq!(controller.state(), ViewState::Uploading);
}

#[test]
fn chunk_sequence_ends_completed_with_expected_indicators() {
    let (mut controller, ticket) = streaming_controller();
    stream(
        &mut controller,
        ticket,
        StreamEvent::Processing {
            message: "Audio split into 3 chunks".to_string(),
            total_chunks: 3,
        },
    );
    stream(
        &mut controller,
        ticket,
        StreamEvent::Transcribing {
            message: "Transcribing chunk 1/3".to_string(),
            current_chunk: 1,
            total_chunks: 3,
        },
    );
    stream(
        &mut controller,
        ticket,
        StreamEvent::PartialText {
            chunk_number: 1,
            partial_text: "uno".to_string(),
        },
    );
    stream(
        &mut controller,
        ticket,
        StreamEvent::ChunkError {
            current_chunk: Some(2),
            message: "Could not understand chunk 2".to_string(),
        },
    );
    stream(
        &mut controller,
        ticket,
        StreamEvent::RetrySuccess {
            chunk_number: 2,
            partial_text: "dos".to_string(),
        },
    );
    stream(
        &mut controller,
        ticket,
        StreamEvent::PartialText {
            chunk_number: 3,
            partial_text: "tres".to_string(),
        },
    );
    let effects = stream(
        &mut controller,
        ticket,
        StreamEvent::Completed {
            full_text: "uno dos tres".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![
            Effect::CloseStream,
            Effect::ScheduleSettle {
                ticket,
                after: DEFAULT_SETTLE_DELAY,
            },
        ]
    );
    assert!(!controller.has_open_stream());
    assert_eq!(controller.state(), ViewState::Streaming);
    assert!(controller.transcript().is_none());

    controller.dispatch(ControllerEvent::Settle { ticket });
    assert_eq!(controller.state(), ViewState::Completed);
    assert_eq!(controller.transcript(), Some("uno dos tres"));
    assert_eq!(
        controller.session().expect("session").chunks,
        vec![ChunkStatus::Success, ChunkStatus::Retried, ChunkStatus::Success]
    );
    assert_eq!(controller.download_name(), "talk-transcripcion.txt");
}

#[test]
fn events_after_terminal_status_are_ignored() {
    let (mut controller, ticket) = streaming_controller();
    stream(
        &mut controller,
        ticket,
        StreamEvent::Completed {
            full_text: "done".to_string(),
        },
    );
    let effects = stream(
        &mut controller,
        ticket,
        StreamEvent::Error {
            message: "late".to_string(),
            trace: None,
        },
    );
    assert!(effects.is_empty());
    controller.dispatch(ControllerEvent::Settle { ticket });
    assert_eq!(controller.state(), ViewState::Completed);
}

#[test]
fn server_error_settles_into_failed() {
    let (mut controller, ticket) = streaming_controller();
    stream(
        &mut controller,
        ticket,
        StreamEvent::Error {
            message: "Nothing could be transcribed".to_string(),
            trace: None,
        },
    );
    assert!(!controller.has_open_stream());
    controller.dispatch(ControllerEvent::Settle { ticket });
    assert_eq!(controller.state(), ViewState::Failed);
    let failure = controller.failure().expect("failure");
    assert_eq!(failure.kind, ErrorKind::ServerReported);
    assert_eq!(failure.message, "Nothing could be transcribed");

    // No staged file survives a successful hand-off, so retry starts over.
    controller.dispatch(ControllerEvent::Retry);
    assert_eq!(controller.state(), ViewState::Idle);
}

#[test]
fn unknown_status_is_a_no_op() {
    let (mut controller, ticket) = streaming_controller();
    let before = controller.session().expect("session").log.len();
    let effects = stream(&mut controller, ticket, StreamEvent::Unknown);
    assert!(effects.is_empty());
    assert_eq!(controller.state(), ViewState::Streaming);
    assert_eq!(controller.session().expect("session").log.len(), before);
}

#[test]
fn stream_failure_closes_subscription_and_keeps_partial_session() {
    let (mut controller, ticket) = streaming_controller();
    stream(
        &mut controller,
        ticket,
        StreamEvent::PartialText {
            chunk_number: 1,
            partial_text: "uno".to_string(),
        },
    );
    let effects = controller.dispatch(ControllerEvent::StreamFailed {
        ticket,
        error: StreamError::Closed,
    });
    assert_eq!(effects, vec![Effect::CloseStream]);
    assert!(!controller.has_open_stream());
    assert_eq!(controller.state(), ViewState::Streaming);
    let session = controller.session().expect("session");
    assert_eq!(session.phase, StreamPhase::Interrupted);
    assert_eq!(session.log.last().map(|l| l.text.as_str()), Some(STREAM_LOST_MESSAGE));

    // A second failure report for the same stream changes nothing.
    assert!(controller
        .dispatch(ControllerEvent::StreamFailed {
            ticket,
            error: StreamError::Closed,
        })
        .is_empty());
}

#[test]
fn cancel_while_streaming_returns_to_idle() {
    let (mut controller, ticket) = streaming_controller();
    let effects = controller.dispatch(ControllerEvent::Cancel);
    assert_eq!(effects, vec![Effect::CloseStream]);
    assert_eq!(controller.state(), ViewState::Idle);
    assert!(controller.session().is_none());
    assert!(!controller.has_open_stream());

    // Events still queued for the cancelled stream are dropped.
    stream(
        &mut controller,
        ticket,
        StreamEvent::Completed {
            full_text: "late".to_string(),
        },
    );
    controller.dispatch(ControllerEvent::Settle { ticket });
    assert_eq!(controller.state(), ViewState::Idle);
    assert!(controller.session().is_none());
}

#[test]
fn reset_from_terminal_states_is_idempotent() {
    let (mut completed, ticket) = streaming_controller();
    stream(
        &mut completed,
        ticket,
        StreamEvent::Completed {
            full_text: "ok".to_string(),
        },
    );
    completed.dispatch(ControllerEvent::Settle { ticket });

    let mut failed = Controller::default();
    failed.dispatch(ControllerEvent::Stage(audio("long.mp3", 10 * 1024 * 1024)));
    failed.dispatch(ControllerEvent::StartUpload);
    let ticket = failed.ticket();
    failed.dispatch(ControllerEvent::UploadFinished {
        ticket,
        result: Err(UploadError::Connectivity("refused".to_string())),
    });

    for controller in [&mut completed, &mut failed] {
        assert!(controller.state().is_terminal());
        assert!(controller.dispatch(ControllerEvent::Reset).is_empty());
        assert_eq!(controller.state(), ViewState::Idle);
        assert!(controller.staged().is_none());
        assert!(controller.advisory().is_none());
        assert!(controller.session().is_none());
        assert!(controller.failure().is_none());

        assert!(controller.dispatch(ControllerEvent::Reset).is_empty());
        assert_eq!(controller.state(), ViewState::Idle);
    }
}

#[test]
fn selection_is_ignored_while_busy() {
    let (mut controller, _) = streaming_controller();
    controller.dispatch(ControllerEvent::Stage(audio("other.wav", 10)));
    assert_eq!(controller.state(), ViewState::Streaming);
    assert!(controller.staged().is_none());
}

#[test]
fn download_name_falls_back_without_file_context() {
    let controller = Controller::default();
    assert_eq!(controller.download_name(), "transcripcion.txt");
}
