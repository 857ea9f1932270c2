//! Run history handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use roundtable_sdk::objects::{HistoryEntry, StoredTranscript};

use crate::history::HistoryError;
use crate::state::AppState;

#[derive(Debug)]
pub(super) enum HistoryApiError {
    /// The id is not a plain file stem.
    InvalidId(String),
    NotFound(String),
    Storage(HistoryError),
}

impl From<HistoryError> for HistoryApiError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::InvalidId(id) => HistoryApiError::InvalidId(id),
            HistoryError::NotFound(id) => HistoryApiError::NotFound(id),
            other => HistoryApiError::Storage(other),
        }
    }
}

impl IntoResponse for HistoryApiError {
    fn into_response(self) -> Response {
        match self {
            HistoryApiError::InvalidId(id) => {
                (StatusCode::BAD_REQUEST, format!("invalid history id: {id}")).into_response()
            }
            HistoryApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("history entry not found: {id}")).into_response()
            }
            HistoryApiError::Storage(e) => {
                tracing::error!(error = %e, "History API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

/// `GET /api/history`: stored runs, newest first.
pub(super) async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, HistoryApiError> {
    Ok(Json(state.history.list().await?))
}

/// `GET /api/history/{id}`
pub(super) async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredTranscript>, HistoryApiError> {
    Ok(Json(state.history.get(&id).await?))
}
