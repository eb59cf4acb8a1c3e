//! Recent successful identifications.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use whatref_core::HistoryEntry;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

/// List history entries, newest first.
#[utoipa::path(get, path = "/api/history", tag = "History",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Newest-first entries", body = [HistoryEntry]),
        (status = 400, description = "Invalid query", body = crate::ErrorBody),
        (status = 500, description = "History store failure", body = crate::ErrorBody),
    ))]
pub async fn list_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Query(query) = query?;
    let entries = state.history().list(query.limit).await?;
    Ok(Json(entries))
}

/// Remove every history entry.
#[utoipa::path(delete, path = "/api/history", tag = "History",
    responses(
        (status = 204, description = "History cleared"),
        (status = 500, description = "History store failure", body = crate::ErrorBody),
    ))]
pub async fn clear_history(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.history().clear().await?;
    tracing::info!(subsystem = "api", op = "clear_history", "History cleared");
    Ok(StatusCode::NO_CONTENT)
}
