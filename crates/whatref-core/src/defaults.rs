//! Centralized default constants for whatref.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates should reference these constants instead of defining their own
//! magic numbers. Environment variable names live next to the value they
//! override.

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3001;

/// Default allowed CORS origin (the web client).
pub const FRONTEND_URL: &str = "http://localhost:3000";

/// Maximum accepted size of one uploaded image field.
pub const UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit (upload plus multipart framing and text fields).
pub const REQUEST_BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";
pub const ENV_UPLOAD_MAX_BYTES: &str = "UPLOAD_MAX_BYTES";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default multimodal model.
pub const VISION_MODEL: &str = "gpt-4o";

/// Bounded response-length hint sent with every request.
pub const VISION_MAX_TOKENS: u32 = 500;

/// Client-side deadline for one inference call, in seconds.
pub const INFERENCE_TIMEOUT_SECS: u64 = 30;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_OPENAI_VISION_MODEL: &str = "OPENAI_VISION_MODEL";
pub const ENV_OPENAI_MAX_TOKENS: &str = "OPENAI_MAX_TOKENS";
pub const ENV_OPENAI_TIMEOUT: &str = "OPENAI_TIMEOUT";

// =============================================================================
// IMAGE NORMALIZATION
// =============================================================================

/// Longest edge of the image sent upstream.
pub const IMAGE_MAX_DIMENSION: u32 = 1920;

/// Byte budget for the image sent upstream.
pub const IMAGE_MAX_BYTES: usize = 1024 * 1024;

/// JPEG quality for the first encode pass.
pub const IMAGE_JPEG_QUALITY: u8 = 80;

/// JPEG quality for the fallback pass when the budget is exceeded.
pub const IMAGE_FALLBACK_JPEG_QUALITY: u8 = 60;

/// Longest edge of history thumbnails.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 256;

pub const ENV_IMAGE_MAX_DIMENSION: &str = "IMAGE_MAX_DIMENSION";
pub const ENV_IMAGE_MAX_BYTES: &str = "IMAGE_MAX_BYTES";
pub const ENV_IMAGE_JPEG_QUALITY: &str = "IMAGE_JPEG_QUALITY";

// =============================================================================
// GUESS SESSIONS
// =============================================================================

/// Guess-again attempts allowed per image, beyond the first analysis.
pub const MAX_GUESS_RETRIES: u32 = 3;

/// Sessions kept by the HTTP layer before the oldest is evicted.
pub const SESSION_CAPACITY: usize = 256;

pub const ENV_MAX_GUESS_RETRIES: &str = "MAX_GUESS_RETRIES";
pub const ENV_SESSION_CAPACITY: &str = "SESSION_CAPACITY";

// =============================================================================
// HISTORY
// =============================================================================

/// Maximum number of history entries retained.
pub const HISTORY_MAX_ENTRIES: usize = 10;

/// Default location of the durable history slot.
pub const HISTORY_PATH: &str = "./data/history.json";

pub const ENV_HISTORY_PATH: &str = "HISTORY_PATH";
pub const ENV_HISTORY_MAX_ENTRIES: &str = "HISTORY_MAX_ENTRIES";

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Optional file overriding the built-in failure lexicon.
pub const ENV_FAILURE_LEXICON_PATH: &str = "FAILURE_LEXICON_PATH";

// =============================================================================
// USER-FACING MESSAGES
// =============================================================================

/// Shown in place of an answer classified as a refusal.
pub const FALLBACK_MESSAGE: &str = "Sorry, the image you uploaded does not appear to be a wristwatch or is too unclear to identify. Please try again with a clearer photo of a single wristwatch on a plain background.";

/// Shown when guess-again is requested past the attempt ceiling.
pub const GUESS_LIMIT_MESSAGE: &str = "You've reached the maximum number of guesses for this image. Please try uploading a different photo of the watch for better results.";

/// Surfaced when no API key is configured.
pub const MISSING_API_KEY_MESSAGE: &str = "OpenAI API key is not configured";

/// Read an environment variable and parse it, falling back to `default`.
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_fits_in_body_limit() {
        assert!(UPLOAD_MAX_BYTES < REQUEST_BODY_LIMIT_BYTES);
    }

    #[test]
    fn test_thumbnail_smaller_than_upstream_image() {
        assert!(THUMBNAIL_MAX_DIMENSION < IMAGE_MAX_DIMENSION);
    }

    #[test]
    fn test_fallback_quality_lower_than_primary() {
        assert!(IMAGE_FALLBACK_JPEG_QUALITY < IMAGE_JPEG_QUALITY);
    }

    #[test]
    fn test_env_or_falls_back_for_unset_key() {
        let value: u32 = env_or("WHATREF_TEST_SURELY_UNSET_KEY", 7);
        assert_eq!(value, 7);
    }
}
