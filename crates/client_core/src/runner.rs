//! Executes controller effects on a tokio runtime.

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::{
    controller::{ControllerEvent, Effect},
    subscription::Subscription,
    TranscriptionClient,
};

/// Where network outcomes are delivered back to the controller's owner.
pub trait EventSink: Clone + Send + Sync + 'static {
    fn deliver(&self, event: ControllerEvent);
}

impl EventSink for UnboundedSender<ControllerEvent> {
    fn deliver(&self, event: ControllerEvent) {
        if self.send(event).is_err() {
            debug!("controller event receiver dropped");
        }
    }
}

/// Owns the single progress subscription and spawns uploads and settle
/// timers. Must be used from within a tokio runtime.
pub struct EffectRunner<S: EventSink> {
    client: TranscriptionClient,
    sink: S,
    subscription: Option<Subscription>,
}

impl<S: EventSink> EffectRunner<S> {
    pub fn new(client: TranscriptionClient, sink: S) -> Self {
        Self {
            client,
            sink,
            subscription: None,
        }
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn apply_all(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.apply(effect);
        }
    }

    pub fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Upload { ticket, file } => {
                let client = self.client.clone();
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    let result = client.upload(&file).await;
                    sink.deliver(ControllerEvent::UploadFinished { ticket, result });
                });
            }
            Effect::OpenStream { ticket, handle } => {
                let next =
                    Subscription::spawn(self.client.clone(), ticket, handle, self.sink.clone());
                if let Some(previous) = self.subscription.replace(next) {
                    debug!(ticket = previous.ticket(), "replacing previous progress stream");
                }
            }
            Effect::CloseStream => {
                self.subscription = None;
            }
            Effect::ScheduleSettle { ticket, after } => {
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    sink.deliver(ControllerEvent::Settle { ticket });
                });
            }
        }
    }
}
