//! Run control request and response objects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/simulation/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub scenario_id: String,
}

/// Response of the start and stop endpoints.
///
/// `success` is the `accepted` flag of the control surface; `message`
/// carries the rejection reason when it is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

impl SimulationResponse {
    pub fn accepted(message: impl Into<String>, run_id: Option<Uuid>) -> Self {
        Self {
            success: true,
            message: message.into(),
            run_id,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            run_id: None,
        }
    }
}

/// Entry of `GET /api/scenarios`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}
