//! SSE transport adapter.
//!
//! Each `GET /api/events` connection owns one hub channel. The response
//! body pulls from that channel; when the client goes away the body is
//! dropped and the [`Subscription`] guard unsubscribes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use roundtable_core::events::ChannelId;
use roundtable_core::hub::{Hub, ReadOutcome};
use roundtable_sdk::objects::{RunStatus, topics};
use roundtable_sdk::sse::SseFrame;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::watch;
use tokio_stream::StreamExt;

use crate::state::AppState;

/// Unsubscribes its channel when dropped.
struct Subscription {
    hub: Hub,
    id: ChannelId,
    shutdown: watch::Receiver<bool>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(channel_id = %self.id, "Event stream closed");
        self.hub.unsubscribe(self.id);
    }
}

/// `GET /api/events`: live event stream.
///
/// Starts with a `connected` frame and a `run_status` frame, then relays
/// every hub event. Idle periods are filled with `:` keep-alive comments.
pub(super) async fn event_stream(State(state): State<AppState>) -> Response {
    let id = state.hub.subscribe();
    let subscription = Subscription {
        hub: state.hub.clone(),
        id,
        shutdown: state.shutdown.clone(),
    };

    let preamble = tokio_stream::iter(
        preamble(id, &state.controller.status())
            .into_iter()
            .map(|frame| Ok::<Bytes, Infallible>(frame.encode())),
    );

    let live = futures_util::stream::unfold(subscription, |mut subscription| async move {
        let outcome = tokio::select! {
            biased;
            _ = server_closing(&mut subscription.shutdown) => ReadOutcome::Closed,
            outcome = subscription.hub.read(subscription.id) => outcome,
        };
        let frame = match outcome {
            ReadOutcome::Event(event) => match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(
                        channel_id = %subscription.id,
                        sequence = event.sequence,
                        error = %e,
                        "Failed to encode event"
                    );
                    SseFrame::keep_alive()
                }
            },
            ReadOutcome::KeepAlive | ReadOutcome::Idle => SseFrame::keep_alive(),
            ReadOutcome::Closed => {
                tracing::info!(channel_id = %subscription.id, "Channel closed, ending stream");
                return None;
            }
        };
        Some((Ok::<Bytes, Infallible>(frame.encode()), subscription))
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(preamble.chain(live)),
    )
        .into_response()
}

async fn server_closing(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closing| *closing).await;
}

/// Per-connection frames sent before any hub event.
fn preamble(id: ChannelId, status: &RunStatus) -> Vec<SseFrame> {
    let connected = json!({ "status": "connected", "channel_id": id });
    let mut frames = vec![SseFrame::named(topics::CONNECTED, connected.to_string())];
    match serde_json::to_string(status) {
        Ok(status) => frames.push(SseFrame::named(topics::RUN_STATUS, status)),
        Err(e) => tracing::error!(channel_id = %id, error = %e, "Failed to encode run status"),
    }
    frames
}
