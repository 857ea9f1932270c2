//! Run control handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use roundtable_core::lifecycle::{LifecycleError, RunConfig};
use roundtable_sdk::objects::{RunStatus, ScenarioInfo, SimulationRequest, SimulationResponse};

use crate::state::AppState;

#[derive(Debug)]
pub(super) enum SimulationApiError {
    /// The requested scenario is not in the catalogue.
    UnknownScenario(String),
}

impl IntoResponse for SimulationApiError {
    fn into_response(self) -> Response {
        match self {
            SimulationApiError::UnknownScenario(id) => (
                StatusCode::NOT_FOUND,
                Json(SimulationResponse::rejected(format!("unknown scenario: {id}"))),
            )
                .into_response(),
        }
    }
}

/// `GET /api/scenarios`
pub(super) async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioInfo>> {
    Json(state.scenarios.list())
}

/// `POST /api/simulation/start`
///
/// A start rejected because a run is active is answered with
/// `success: false`, not an error status.
pub(super) async fn start_simulation(
    State(state): State<AppState>,
    Json(request): Json<SimulationRequest>,
) -> Result<Json<SimulationResponse>, SimulationApiError> {
    if !state.scenarios.contains(&request.scenario_id) {
        tracing::info!(scenario = %request.scenario_id, "Start requested for unknown scenario");
        return Err(SimulationApiError::UnknownScenario(request.scenario_id));
    }

    let response = match state.controller.start(RunConfig::named(&request.scenario_id)) {
        Ok(ticket) => SimulationResponse::accepted("run started", Some(ticket.run_id)),
        Err(e @ LifecycleError::AlreadyRunning { .. }) => {
            tracing::warn!(scenario = %request.scenario_id, error = %e, "Start rejected");
            SimulationResponse::rejected(e.to_string())
        }
    };
    Ok(Json(response))
}

/// `POST /api/simulation/stop`
pub(super) async fn stop_simulation(State(state): State<AppState>) -> Json<SimulationResponse> {
    if state.controller.stop() {
        Json(SimulationResponse::accepted("run stopping", None))
    } else {
        Json(SimulationResponse::rejected("no run in progress"))
    }
}

/// `GET /api/simulation/status`
pub(super) async fn simulation_status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.controller.status())
}
