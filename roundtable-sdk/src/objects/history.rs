//! Stored run transcripts.
//!
//! Completed runs are written as one JSON document per run. The listing
//! endpoint only returns [`HistoryEntry`] summaries; the detail endpoint
//! returns the whole [`StoredTranscript`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::lifecycle::EndReason;

/// Summary row of `GET /api/history`, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// File stem, usable with `GET /api/history/{id}`.
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Name of the run (the scenario id for scripted runs).
    pub scenario: String,
}

/// One event as it was published during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub sequence: u64,
    pub topic: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub payload: serde_json::Value,
}

/// Full transcript of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTranscript {
    pub run_id: Uuid,
    pub name: String,
    pub reason: EndReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub events: Vec<StoredEvent>,
}
