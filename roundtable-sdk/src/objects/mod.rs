//! Objects exchanged between the server and its clients.

pub mod history;
pub mod lifecycle;
pub mod message;
pub mod simulation;
pub mod stats;

pub use history::{HistoryEntry, StoredEvent, StoredTranscript};
pub use lifecycle::{EndReason, RunEnded, RunPhase, RunStarted, RunStatus, RunStopping};
pub use message::AgentMessage;
pub use simulation::{ScenarioInfo, SimulationRequest, SimulationResponse};
pub use stats::HubStatsResponse;

/// Topic names carried on the `event:` line of the stream.
pub mod topics {
    /// A run was accepted and its producer is about to start.
    pub const RUN_STARTED: &str = "run_started";
    /// A stop was requested; the run is tearing down.
    pub const RUN_STOPPING: &str = "run_stopping";
    /// Terminal lifecycle event, published exactly once per run.
    pub const RUN_ENDED: &str = "run_ended";
    /// A message produced by one of the conversation participants.
    pub const AGENT_MESSAGE: &str = "agent_message";
    /// Per-connection greeting, never published through the hub.
    pub const CONNECTED: &str = "connected";
    /// Per-connection snapshot of the current run status.
    pub const RUN_STATUS: &str = "run_status";
}
