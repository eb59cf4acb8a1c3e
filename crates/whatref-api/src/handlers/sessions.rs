//! Guess sessions.
//!
//! A session keeps the normalized image and every earlier answer on the
//! server, so a guess-again request only needs the optional user hint.
//! Mutating requests take the session exclusively; a second request
//! while one is in flight gets `409 SessionBusy`.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::{BytesRejection, PathRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use whatref_core::{Error, GuessSession, SessionSnapshot};

use super::{read_image_form, require_image};
use crate::{ApiError, AppState};

/// Body of a guess-again request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuessAgainRequest {
    /// Extra information about the watch; replaces any earlier hint.
    pub user_info: Option<String>,
}

/// Multipart form accepted by the session image endpoints.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionImageForm {
    /// JPEG, PNG or WebP image, at most 5 MiB.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// An empty body means no hint; anything else must be valid JSON.
fn parse_guess_again(body: &[u8]) -> Result<GuessAgainRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GuessAgainRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Start a session and run the first analysis.
///
/// The session is only registered when the first analysis succeeds.
#[utoipa::path(post, path = "/api/sessions", tag = "Sessions",
    request_body(content = SessionImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Session created", body = SessionSnapshot),
        (status = 400, description = "Missing or invalid image", body = crate::ErrorBody),
        (status = 413, description = "Image too large", body = crate::ErrorBody),
        (status = 500, description = "Configuration or inference failure", body = crate::ErrorBody),
    ))]
pub async fn create_session(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let mut form = read_image_form(&mut multipart?, state.config.upload_max_bytes).await?;
    let upload = require_image(&mut form)?;

    let mut session = GuessSession::new(state.services.clone());
    session.submit_new_image(upload).await?;
    let snapshot = session.snapshot();
    state.sessions.insert(session).await;

    info!(
        subsystem = "api",
        op = "create_session",
        session_id = %snapshot.id,
        "Session created"
    );
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[utoipa::path(get, path = "/api/sessions/{id}", tag = "Sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current session view", body = SessionSnapshot),
        (status = 404, description = "Unknown session", body = crate::ErrorBody),
    ))]
pub async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = path?;
    let handle = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))?;
    let session = handle.lock().await;
    Ok(Json(session.snapshot()))
}

/// Ask for a different identification of the session's image.
///
/// # Returns
/// - 200 OK with the updated session view
/// - 400 Bad Request if no image has been analyzed yet
/// - 409 Conflict if the guess limit is reached or a request is in flight
/// - 500 Internal Server Error for inference failures; the session is unchanged
#[utoipa::path(post, path = "/api/sessions/{id}/guess-again", tag = "Sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body(content = GuessAgainRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "New guess", body = SessionSnapshot),
        (status = 400, description = "Invalid session state", body = crate::ErrorBody),
        (status = 404, description = "Unknown session", body = crate::ErrorBody),
        (status = 409, description = "Guess limit reached or session busy", body = crate::ErrorBody),
        (status = 500, description = "Inference failure", body = crate::ErrorBody),
    ))]
pub async fn guess_again(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = path?;
    let request = parse_guess_again(&body?)?;
    let mut session = state.sessions.acquire(id).await?;
    session
        .request_guess_again(request.user_info.as_deref())
        .await?;
    Ok(Json(session.snapshot()))
}

/// Replace the session's image and start over.
#[utoipa::path(post, path = "/api/sessions/{id}/image", tag = "Sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body(content = SessionImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "First analysis of the new image", body = SessionSnapshot),
        (status = 400, description = "Missing or invalid image", body = crate::ErrorBody),
        (status = 404, description = "Unknown session", body = crate::ErrorBody),
        (status = 409, description = "Session busy", body = crate::ErrorBody),
        (status = 500, description = "Configuration or inference failure", body = crate::ErrorBody),
    ))]
pub async fn replace_image(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = path?;
    let mut form = read_image_form(&mut multipart?, state.config.upload_max_bytes).await?;
    let upload = require_image(&mut form)?;

    let mut session = state.sessions.acquire(id).await?;
    session.submit_new_image(upload).await?;
    Ok(Json(session.snapshot()))
}

#[utoipa::path(delete, path = "/api/sessions/{id}", tag = "Sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    responses((status = 204, description = "Session removed")))]
pub async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if state.sessions.remove(id).await {
        info!(subsystem = "api", op = "delete_session", session_id = %id, "Session removed");
    }
    Ok(StatusCode::NO_CONTENT)
}
