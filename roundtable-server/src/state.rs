//! Application state shared across all request handlers.

use crate::history::HistoryStore;
use crate::scenarios::ScenarioCatalog;
use roundtable_core::hub::Hub;
use roundtable_core::lifecycle::RunController;
use std::sync::Arc;
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub controller: RunController,
    pub history: Arc<HistoryStore>,
    pub scenarios: Arc<ScenarioCatalog>,
    /// Flips to `true` when the server shuts down; ends open event streams.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        hub: Hub,
        controller: RunController,
        history: HistoryStore,
        scenarios: Arc<ScenarioCatalog>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            hub,
            controller,
            history: Arc::new(history),
            scenarios,
            shutdown,
        }
    }
}
