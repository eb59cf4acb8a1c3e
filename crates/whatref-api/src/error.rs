//! HTTP error mapping.

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{BytesRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;
use whatref_core::{defaults, Error, ErrorKind};

/// Headline for failures of the inference call itself.
pub const ANALYZE_FAILED: &str = "Failed to analyze image";

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Short user-facing message.
    pub error: String,
    /// Underlying cause.
    pub details: String,
    /// Error class, e.g. `TimeoutError`.
    pub error_type: String,
    /// Machine-readable code, e.g. `ETIMEDOUT`.
    pub error_code: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Core(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::Normalization | ErrorKind::InvalidState => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::GuessLimitReached | ErrorKind::SessionBusy => StatusCode::CONFLICT,
                ErrorKind::Configuration
                | ErrorKind::Timeout
                | ErrorKind::Upstream
                | ErrorKind::Network
                | ErrorKind::Storage
                | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, details, kind, code) = match self {
            ApiError::BadRequest(msg) => (
                msg.clone(),
                msg.clone(),
                ErrorKind::Validation.as_str(),
                ErrorKind::Validation.code(),
            ),
            ApiError::PayloadTooLarge(msg) => (
                msg.clone(),
                msg.clone(),
                ErrorKind::Validation.as_str(),
                "LIMIT_FILE_SIZE",
            ),
            ApiError::Core(err) => {
                let kind = err.kind();
                let headline = match err {
                    Error::Config(msg) if msg == defaults::MISSING_API_KEY_MESSAGE => msg.clone(),
                    _ if err.is_inference_failure() => ANALYZE_FAILED.to_string(),
                    Error::Validation(msg)
                    | Error::Normalization(msg)
                    | Error::GuessLimitReached(msg)
                    | Error::SessionBusy(msg)
                    | Error::InvalidState(msg)
                    | Error::NotFound(msg) => msg.clone(),
                    _ => "Internal server error".to_string(),
                };
                (headline, err.to_string(), kind.as_str(), kind.code())
            }
        };
        ErrorBody {
            error,
            details,
            error_type: kind.to_string(),
            error_code: code.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiError {
    /// Wrap an extractor rejection so it gets the JSON error body.
    fn rejected(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(text)
        } else {
            ApiError::BadRequest(text)
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        if status.is_server_error() {
            error!(
                subsystem = "api",
                error_type = %body.error_type,
                error = %body.details,
                "Request failed"
            );
        } else {
            warn!(
                subsystem = "api",
                status = status.as_u16(),
                error_type = %body.error_type,
                error = %body.details,
                "Request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}
