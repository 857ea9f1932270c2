//! HTTP API handlers, mounted under `/api`.
//!
//! # Endpoints
//!
//! - `GET  /events`             – live event stream (SSE)
//! - `GET  /scenarios`          – list the scenario catalogue
//! - `POST /simulation/start`   – start a scripted run
//! - `POST /simulation/stop`    – stop the active run
//! - `GET  /simulation/status`  – current run status
//! - `GET  /history`            – stored runs, newest first
//! - `GET  /history/{id}`       – one stored transcript

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod events;
mod history;
mod simulation;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::event_stream))
        .route("/scenarios", get(simulation::list_scenarios))
        .route("/simulation/start", post(simulation::start_simulation))
        .route("/simulation/stop", post(simulation::stop_simulation))
        .route("/simulation/status", get(simulation::simulation_status))
        .route("/history", get(history::list_history))
        .route("/history/{id}", get(history::get_history))
}
