//! Server-sent events framing.
//!
//! Every hub event travels as one SSE block:
//!
//! ```text
//! event: agent_message
//! id: 42
//! data: {"sequence":42,"timestamp":"...","payload":{...}}
//!
//! ```
//!
//! Keep-alives are a bare comment line followed by the blank terminator
//! (`":\n\n"`). Per-connection frames (`connected`, `run_status`) are
//! events without an `id:` line since they never went through the hub.
//!
//! Parsing the stream is left to `reqwest-eventsource` on the client side.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Errors produced while reading a received frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid event id: {0}")]
    InvalidId(String),

    #[error("invalid event data: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON carried on the `data:` line of a hub event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub sequence: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub payload: serde_json::Value,
}

/// One block of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Event {
        topic: String,
        id: Option<u64>,
        data: String,
    },
    Comment(String),
}

impl SseFrame {
    /// A named event without a sequence id.
    pub fn named(topic: impl Into<String>, data: impl Into<String>) -> Self {
        SseFrame::Event {
            topic: topic.into(),
            id: None,
            data: data.into(),
        }
    }

    /// A hub event: the topic line, the sequence as `id:` and the envelope
    /// as JSON data.
    pub fn from_envelope(
        topic: impl Into<String>,
        envelope: &EventEnvelope,
    ) -> Result<Self, serde_json::Error> {
        Ok(SseFrame::Event {
            topic: topic.into(),
            id: Some(envelope.sequence),
            data: serde_json::to_string(envelope)?,
        })
    }

    /// The empty comment used as keep-alive.
    pub fn keep_alive() -> Self {
        SseFrame::Comment(String::new())
    }

    pub fn is_keep_alive(&self) -> bool {
        matches!(self, SseFrame::Comment(_))
    }

    /// Topic of an event frame, `None` for comments.
    pub fn topic(&self) -> Option<&str> {
        match self {
            SseFrame::Event { topic, .. } => Some(topic),
            SseFrame::Comment(_) => None,
        }
    }

    /// Parse the data line as an [`EventEnvelope`].
    ///
    /// Returns `Ok(None)` for comments and for events without an id.
    pub fn envelope(&self) -> Result<Option<EventEnvelope>, FrameError> {
        match self {
            SseFrame::Event {
                id: Some(_), data, ..
            } => Ok(Some(serde_json::from_str(data)?)),
            _ => Ok(None),
        }
    }

    /// Serialize into wire bytes, including the blank-line terminator.
    pub fn encode(&self) -> Bytes {
        let mut out = String::new();
        match self {
            SseFrame::Event { topic, id, data } => {
                out.push_str("event: ");
                out.push_str(topic);
                out.push('\n');
                if let Some(id) = id {
                    out.push_str("id: ");
                    out.push_str(&id.to_string());
                    out.push('\n');
                }
                for line in data.split('\n') {
                    out.push_str("data: ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            SseFrame::Comment(text) => {
                for line in text.split('\n') {
                    out.push(':');
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
        Bytes::from(out)
    }
}
