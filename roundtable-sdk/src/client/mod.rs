//! HTTP clients for the Roundtable server.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest` and `reqwest-eventsource`.

mod control;
mod events;

pub use control::ControlClient;
pub use events::{EventStreamClient, FrameStream};

use reqwest::StatusCode;

use crate::sse::FrameError;

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event stream contained a malformed block.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The event stream failed or was closed.
    #[error("event stream error: {0}")]
    EventSource(#[from] reqwest_eventsource::Error),

    /// The event stream request has a body that cannot be replayed.
    #[error("event stream request cannot be cloned")]
    UncloneableRequest,

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
