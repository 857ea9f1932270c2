//! Hub counters.

use serde::{Deserialize, Serialize};

/// Response of `GET /api/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStatsResponse {
    /// Events published since start-up; also the last assigned sequence number.
    pub published: u64,
    /// Items discarded by drop-oldest across all channels.
    pub dropped: u64,
    /// Channels removed by the liveness monitor.
    pub evicted: u64,
    /// Channels currently registered.
    pub subscribers: usize,
}
