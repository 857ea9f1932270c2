//! Run lifecycle objects.
//!
//! The lifecycle payloads are the `payload` part of the `run_started`,
//! `run_stopping` and `run_ended` events. [`RunStatus`] is the snapshot
//! served by `GET /api/simulation/status` and sent as the first frame of
//! every event stream.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Phase of the single-run state machine.
///
/// `Idle -> Starting -> Running -> Stopping -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl RunPhase {
    /// Returns `true` for every phase other than [`RunPhase::Idle`].
    pub fn is_active(self) -> bool {
        !matches!(self, RunPhase::Idle)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Starting => write!(f, "starting"),
            RunPhase::Running => write!(f, "running"),
            RunPhase::Stopping => write!(f, "stopping"),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The producer returned normally.
    Completed,
    /// The run was cancelled through `stop()`.
    Stopped,
    /// The producer failed, panicked or could not be prepared.
    Error,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Completed => write!(f, "completed"),
            EndReason::Stopped => write!(f, "stopped"),
            EndReason::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of the controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub phase: RunPhase,
    /// Same as `phase.is_active()`.
    pub is_running: bool,
    pub run_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
}

impl RunStatus {
    /// The status of a controller with no run.
    pub fn idle() -> Self {
        Self {
            phase: RunPhase::Idle,
            is_running: false,
            run_id: None,
            name: None,
            started_at: None,
        }
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Payload of `run_started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStarted {
    pub run_id: Uuid,
    pub name: String,
}

/// Payload of `run_stopping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStopping {
    pub run_id: Uuid,
}

/// Payload of `run_ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEnded {
    pub run_id: Uuid,
    pub reason: EndReason,
    /// Failure description, present only for [`EndReason::Error`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ended_wire_shape() {
        let ended = RunEnded {
            run_id: Uuid::nil(),
            reason: EndReason::Stopped,
            detail: None,
        };
        let json = serde_json::to_value(&ended).unwrap();
        assert_eq!(json["reason"], "stopped");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_idle_status() {
        let status = RunStatus::idle();
        assert!(!status.phase.is_active());
        assert!(!status.is_running);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "idle");
        assert!(json["started_at"].is_null());
    }
}
