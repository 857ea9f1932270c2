//! Event type definitions.

use roundtable_sdk::objects::{EndReason, StoredEvent, StoredTranscript};
use roundtable_sdk::sse::{EventEnvelope, SseFrame};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Identifier of a subscriber channel.
///
/// Allocated from a counter that only moves forward, so an id is never
/// handed out twice by the same hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelId(pub(crate) u64);

impl ChannelId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// A published event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Hub-wide sequence number, strictly increasing and never reused.
    pub sequence: u64,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: OffsetDateTime,
}

/// Events are shared by every channel they were pushed into.
pub type SharedEvent = Arc<Event>;

impl Event {
    /// The JSON carried on the `data:` line.
    pub fn envelope(&self) -> EventEnvelope {
        EventEnvelope {
            sequence: self.sequence,
            timestamp: self.timestamp,
            payload: self.payload.clone(),
        }
    }

    /// Wire frame for the event stream.
    pub fn to_frame(&self) -> Result<SseFrame, serde_json::Error> {
        SseFrame::from_envelope(self.topic.clone(), &self.envelope())
    }

    pub fn to_stored(&self) -> StoredEvent {
        StoredEvent {
            sequence: self.sequence,
            topic: self.topic.clone(),
            timestamp: self.timestamp,
            payload: self.payload.clone(),
        }
    }
}

/// Everything a finished run published, handed to persistence.
#[derive(Debug, Clone)]
pub struct RunTranscript {
    pub run_id: Uuid,
    pub name: String,
    pub reason: EndReason,
    pub detail: Option<String>,
    pub started_at: OffsetDateTime,
    pub ended_at: OffsetDateTime,
    /// Ordered by sequence number.
    pub events: Vec<SharedEvent>,
}

impl RunTranscript {
    pub fn to_stored(&self) -> StoredTranscript {
        StoredTranscript {
            run_id: self.run_id,
            name: self.name.clone(),
            reason: self.reason,
            detail: self.detail.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            events: self.events.iter().map(|e| e.to_stored()).collect(),
        }
    }
}
