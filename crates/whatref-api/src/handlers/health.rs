//! Liveness check.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the server is accepting requests.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Whether an OpenAI API key is present.
    pub openai_configured: bool,
    pub version: String,
    /// Guess sessions currently held in memory.
    pub active_sessions: usize,
}

#[utoipa::path(get, path = "/api/health", tag = "System",
    responses((status = 200, description = "Server is up", body = HealthResponse)))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        openai_configured: state.gateway().backend().is_configured(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.sessions.len().await,
    })
}
