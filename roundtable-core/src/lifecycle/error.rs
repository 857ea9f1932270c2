use roundtable_sdk::objects::RunPhase;
use thiserror::Error;

/// Errors returned by the controller's control surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` while a run is not idle. Nothing changed.
    #[error("a run is already active (phase: {phase})")]
    AlreadyRunning { phase: RunPhase },
}

/// Failures reported by a producer.
///
/// The controller never propagates these; they end the run with
/// `run_ended{reason=error}`.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The run configuration cannot be used by this producer.
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    /// A resource the producer needs is unavailable.
    #[error("resource unavailable: {0}")]
    Resource(String),

    /// A payload could not be serialized.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run already ended; nothing more can be published.
    #[error("run has already ended")]
    RunEnded,

    #[error("{0}")]
    Failed(String),
}

impl ProducerError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        ProducerError::Failed(message.to_string())
    }
}
