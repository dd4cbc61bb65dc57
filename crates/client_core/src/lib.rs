use std::{collections::VecDeque, time::Duration};

use anyhow::{anyhow, Context, Result};
use futures::Stream;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::SessionHandle,
    error::{StreamError, UploadError},
    protocol::{StreamMessage, UploadResponse, UPLOAD_FIELD},
};
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod controller;
pub mod export;
pub mod runner;
pub mod session;
pub mod sse;
pub mod staging;
pub mod subscription;
pub mod view;

pub use controller::{Controller, ControllerEvent, Effect, Failure, Ticket};
pub use runner::{EffectRunner, EventSink};
pub use session::{LogEntry, Outcome, StreamPhase, TranscriptionSession};
pub use staging::{format_file_size, stage, Advisory, LocalFile, StagedFile};
pub use subscription::Subscription;
pub use view::{Panel, ProgressAction, ViewModel};

use sse::{SseDecoder, SseFrame};

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// HTTP access to the transcription server's two endpoints.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    http: Client,
    server_url: Url,
    upload_timeout: Option<Duration>,
}

impl TranscriptionClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_http(Client::new(), server_url)
    }

    pub fn with_http(http: Client, server_url: &str) -> Result<Self> {
        let server_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        if server_url.cannot_be_a_base() {
            return Err(anyhow!("server url '{server_url}' cannot carry a path"));
        }
        Ok(Self {
            http,
            server_url,
            upload_timeout: None,
        })
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = Some(timeout);
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.server_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends the staged file as multipart field `file` to `POST /upload`.
    ///
    /// The body is read as JSON whatever the HTTP status, since the server
    /// reports rejections as `success: false`.
    pub async fn upload(&self, file: &staging::StagedFile) -> Result<SessionHandle, UploadError> {
        let bytes = tokio::fs::read(&file.path).await.map_err(|err| {
            UploadError::LocalRead(format!("{}: {err}", file.path.display()))
        })?;
        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(file.upload_mime())
            .map_err(|err| UploadError::Connectivity(format!("invalid part mime: {err}")))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint(&["upload"]);
        info!(%url, name = %file.name, size_bytes = file.size_bytes, "uploading audio file");
        let mut request = self.http.post(url).multipart(form);
        if let Some(timeout) = self.upload_timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|err| UploadError::Connectivity(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| UploadError::Connectivity(err.to_string()))?;
        let parsed: UploadResponse = serde_json::from_slice(&body).map_err(|err| {
            UploadError::Connectivity(format!("HTTP {status} with non-JSON body: {err}"))
        })?;
        let handle = parsed.into_handle()?;
        info!(%handle, "upload accepted");
        Ok(handle)
    }

    /// Opens `GET /transcribe/{handle}` as a server-push event stream.
    pub async fn open_event_stream(
        &self,
        handle: &SessionHandle,
    ) -> Result<EventStream, StreamError> {
        let url = self.endpoint(&["transcribe", handle.as_str()]);
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, EVENT_STREAM_MIME)
            .send()
            .await
            .map_err(|err| StreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if !content_type
            .as_deref()
            .is_some_and(|value| value.starts_with(EVENT_STREAM_MIME))
        {
            return Err(StreamError::NotEventStream { content_type });
        }

        info!(%url, "progress stream opened");
        Ok(EventStream::new(response))
    }
}

/// Decoded progress messages of one open event stream.
pub struct EventStream {
    response: Response,
    decoder: SseDecoder,
    pending: VecDeque<SseFrame>,
    finished: bool,
}

impl EventStream {
    fn new(response: Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next status message; `None` once the body ends. Frames that are not
    /// plain messages or whose payload is not valid JSON are skipped.
    pub async fn next_message(&mut self) -> Option<Result<StreamMessage, StreamError>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                if !frame.is_message() {
                    debug!(event = ?frame.event, "skipping named event");
                    continue;
                }
                match serde_json::from_str::<StreamMessage>(&frame.data) {
                    Ok(message) => return Some(Ok(message)),
                    Err(err) => {
                        warn!(error = %err, "skipping malformed progress payload");
                        continue;
                    }
                }
            }
            if self.finished {
                return None;
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => self.pending.extend(self.decoder.push(&bytes)),
                Ok(None) => {
                    self.finished = true;
                    self.pending.extend(self.decoder.finish());
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(StreamError::Transport(err.to_string())));
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<StreamMessage, StreamError>> {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next_message().await?;
            Some((item, stream))
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
