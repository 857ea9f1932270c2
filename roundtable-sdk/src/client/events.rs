//! Event stream subscriber with reconnect.

use futures_util::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

use super::ClientError;
use crate::backoff::ReconnectBackoff;
use crate::sse::{FrameError, SseFrame};

/// One open `GET /api/events` response.
///
/// Keep-alive comments are consumed by the parser and never surface here.
pub struct FrameStream {
    source: EventSource,
    pending: Option<SseFrame>,
}

impl FrameStream {
    /// Next frame, or `Ok(None)` once the server closed the stream.
    pub async fn next_frame(&mut self) -> Result<Option<SseFrame>, ClientError> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        loop {
            match self.source.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) => {
                    return Ok(Some(frame_of(message.event, &message.id, message.data)?));
                }
                Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                    self.source.close();
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.source.close();
                    return Err(stream_error(e).await);
                }
            }
        }
    }
}

/// Rebuild an [`SseFrame`] from a parsed message. An empty id means the
/// frame never went through the hub.
fn frame_of(topic: String, id: &str, data: String) -> Result<SseFrame, FrameError> {
    let id = match id {
        "" => None,
        id => Some(
            id.parse::<u64>()
                .map_err(|_| FrameError::InvalidId(id.to_string()))?,
        ),
    };
    Ok(SseFrame::Event { topic, id, data })
}

async fn stream_error(e: reqwest_eventsource::Error) -> ClientError {
    match e {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            ClientError::Api { status, body }
        }
        e => ClientError::EventSource(e),
    }
}

/// Subscribes to the server's event stream.
///
/// [`connect`](Self::connect) opens a single stream. [`forward`](Self::forward)
/// keeps one open for as long as the receiver lives, reconnecting with
/// [`ReconnectBackoff`] whenever the transport fails.
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    http: Client,
    base_url: Url,
    backoff: ReconnectBackoff,
}

impl EventStreamClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            backoff: ReconnectBackoff::default(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Open the event stream once.
    ///
    /// Resolves after the server accepted the subscription. The event
    /// source's own retries are disabled; reconnecting is up to
    /// [`forward`](Self::forward).
    pub async fn connect(&self) -> Result<FrameStream, ClientError> {
        let url = self.base_url.join("/api/events")?;
        let mut source =
            EventSource::new(self.http.get(url)).map_err(|_| ClientError::UncloneableRequest)?;
        source.set_retry_policy(Box::new(Never));

        let pending = match source.next().await {
            Some(Ok(Event::Open)) => None,
            Some(Ok(Event::Message(message))) => {
                Some(frame_of(message.event, &message.id, message.data)?)
            }
            Some(Err(e)) => {
                source.close();
                return Err(stream_error(e).await);
            }
            None => return Err(ClientError::EventSource(reqwest_eventsource::Error::StreamEnded)),
        };

        Ok(FrameStream { source, pending })
    }

    /// Forward every frame into `tx`, reconnecting until `shutdown_rx`
    /// flips to `true` or `tx` is closed.
    pub async fn forward(self, tx: mpsc::Sender<SseFrame>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = self.backoff.clone();

        loop {
            let result = tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => break,
                result = self.pump(&tx, &mut backoff) => result,
            };

            match result {
                Ok(()) if tx.is_closed() => break,
                Ok(()) => info!("event stream closed by server, reconnecting"),
                Err(e) => warn!(error = %e, "event stream failed"),
            }

            let delay = backoff.next_delay();
            debug!(?delay, attempt = backoff.attempts(), "waiting before reconnect");
            tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("event stream forwarder stopped");
    }

    async fn pump(
        &self,
        tx: &mpsc::Sender<SseFrame>,
        backoff: &mut ReconnectBackoff,
    ) -> Result<(), ClientError> {
        let mut stream = self.connect().await?;
        backoff.reset();
        info!("event stream connected");

        while let Some(frame) = stream.next_frame().await? {
            if tx.send(frame).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}

/// Resolves once shutdown is requested or the sender is gone; other
/// updates of the watch are ignored.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}
