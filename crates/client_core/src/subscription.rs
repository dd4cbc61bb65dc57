use futures::{pin_mut, StreamExt};
use shared::{domain::SessionHandle, error::StreamError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{controller::Ticket, runner::EventSink, ControllerEvent, TranscriptionClient};

/// A live progress stream. The reader task is aborted when the handle is
/// dropped, so releasing the subscription is tied to ownership.
pub struct Subscription {
    ticket: Ticket,
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Opens the stream on the current tokio runtime and forwards every
    /// message to `sink` tagged with `ticket`. The reader stops on its own
    /// after a terminal status; any other ending is reported as a failure.
    pub fn spawn<S: EventSink>(
        client: TranscriptionClient,
        ticket: Ticket,
        handle: SessionHandle,
        sink: S,
    ) -> Self {
        let stream_handle = handle.clone();
        let task = tokio::spawn(async move {
            let stream = match client.open_event_stream(&stream_handle).await {
                Ok(stream) => stream.into_stream(),
                Err(error) => {
                    sink.deliver(ControllerEvent::StreamFailed { ticket, error });
                    return;
                }
            };
            pin_mut!(stream);

            while let Some(item) = stream.next().await {
                match item {
                    Ok(message) => {
                        let terminal = message.is_terminal();
                        sink.deliver(ControllerEvent::Stream { ticket, message });
                        if terminal {
                            debug!(ticket, "progress stream reached a terminal status");
                            return;
                        }
                    }
                    Err(error) => {
                        sink.deliver(ControllerEvent::StreamFailed { ticket, error });
                        return;
                    }
                }
            }
            sink.deliver(ControllerEvent::StreamFailed {
                ticket,
                error: StreamError::Closed,
            });
        });

        Self {
            ticket,
            handle,
            task,
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            info!(ticket = self.ticket, handle = %self.handle, "closing progress stream");
        }
        self.task.abort();
    }
}
