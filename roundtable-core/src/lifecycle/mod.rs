//! Single-run lifecycle.
//!
//! At most one run exists at a time. The [`RunController`] owns the run
//! state and the producer's cancellation signal; producers only see a
//! [`RunContext`].
//!
//! ```text
//! Idle --start--> Starting --producer ready--> Running
//!   ^                                             |
//!   +--cleanup done-- Stopping <--stop | exit-----+
//! ```

mod controller;
mod error;
mod producer;

pub use controller::{ControllerConfig, DEFAULT_STOP_GRACE, RunConfig, RunController, RunTicket};
pub use error::{LifecycleError, ProducerError};
pub use producer::{CancelSignal, Producer, RunContext, RunPublisher};
