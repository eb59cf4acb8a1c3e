//! OpenAI-specific error handling.

use whatref_core::Error;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Image rejected (unsupported or too large).
    InvalidImage,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type/code.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("image") => Self::InvalidImage,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether an operator has to change configuration to fix it.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::AuthenticationError | Self::ModelNotFound)
    }
}

/// Convert an OpenAI error into a whatref [`Error`].
pub fn to_whatref_error(code: OpenAIErrorCode, status: u16, message: &str) -> Error {
    let detail = match code {
        OpenAIErrorCode::AuthenticationError => format!("Authentication failed: {}", message),
        OpenAIErrorCode::ModelNotFound => format!("Model not found: {}", message),
        OpenAIErrorCode::RateLimitExceeded => format!("Rate limit exceeded: {}", message),
        OpenAIErrorCode::InvalidImage => format!("Image rejected by model: {}", message),
        OpenAIErrorCode::ServerError | OpenAIErrorCode::Unknown => {
            format!("OpenAI returned {}: {}", status, message)
        }
    };
    if code.is_configuration() {
        Error::Config(detail)
    } else {
        Error::Upstream(detail)
    }
}
