//! Conversation message payload.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Payload of an `agent_message` event.
///
/// ```json
/// {"id":"...","sender":"Manager","sender_display_name":"Manager",
///  "content":"Morning all.","timestamp":"2026-01-01T09:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    /// Stable participant key (`Manager`, `SeniorDev`, ...).
    pub sender: String,
    pub sender_display_name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
