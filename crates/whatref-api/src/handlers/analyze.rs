//! Stateless single-shot analysis.
//!
//! The client carries all retry context (previous guesses, hint) in the
//! form; nothing is stored server-side and the history is not touched.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use whatref_core::{build_prompt, defaults, Error, PromptMode};

use super::{read_image_form, require_image};
use crate::{ApiError, AppState};

/// Multipart form accepted by `POST /api/analyze`.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeForm {
    /// JPEG, PNG or WebP image, at most 5 MiB.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    /// `"true"` to request a different guess.
    pub guess_again: Option<String>,
    /// JSON array of earlier answers.
    pub previous_guesses: Option<String>,
    /// Free-text hint from the user.
    pub user_info: Option<String>,
}

/// Response from `POST /api/analyze`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    /// Unmodified answer from the model.
    pub result: String,
    pub timestamp: DateTime<Utc>,
    pub is_failure: bool,
    /// `result`, or the fallback message when the answer is a refusal.
    pub display_text: String,
}

/// Identify the watch in an uploaded image.
///
/// # Returns
/// - 200 OK with the raw answer
/// - 400 Bad Request if the image is missing, unsupported, or undecodable
/// - 413 Payload Too Large if the image exceeds the upload limit
/// - 500 Internal Server Error for missing credentials and inference failures
#[utoipa::path(post, path = "/api/analyze", tag = "Analysis",
    request_body(content = AnalyzeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Model answer", body = AnalyzeResponse),
        (status = 400, description = "Missing or invalid image", body = crate::ErrorBody),
        (status = 413, description = "Image too large", body = crate::ErrorBody),
        (status = 500, description = "Configuration or inference failure", body = crate::ErrorBody),
    ))]
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut form = read_image_form(&mut multipart?, state.config.upload_max_bytes).await?;
    let upload = require_image(&mut form)?;

    if !state.gateway().backend().is_configured() {
        warn!(subsystem = "api", op = "analyze", "OpenAI API key missing");
        return Err(Error::Config(defaults::MISSING_API_KEY_MESSAGE.to_string()).into());
    }

    info!(
        subsystem = "api",
        op = "analyze",
        image_bytes = upload.len(),
        guess_again = form.guess_again,
        previous_guesses = form.previous_guesses.len(),
        "Analyzing uploaded image"
    );

    let image = state.services.normalizer.normalize_async(upload).await?;
    let mode = if form.guess_again {
        PromptMode::Retry
    } else {
        PromptMode::FirstAttempt
    };
    let prompt = build_prompt(
        mode,
        &form.previous_guesses,
        form.user_info.as_deref().unwrap_or_default(),
    );

    let result = state.gateway().analyze(&image, &prompt).await?;

    Ok(Json(AnalyzeResponse {
        result: result.raw_text,
        timestamp: result.timestamp,
        is_failure: result.is_failure,
        display_text: result.display_text,
    }))
}
