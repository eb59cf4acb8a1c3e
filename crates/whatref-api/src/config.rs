//! Server configuration from environment variables.

use std::time::Duration;

use whatref_core::{defaults, NormalizerConfig};

/// Settings for the HTTP server and the session workflow it drives.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS.
    pub frontend_origins: Vec<String>,
    /// Maximum size of one uploaded image field.
    pub upload_max_bytes: usize,
    /// Maximum size of a whole request body.
    pub body_limit_bytes: usize,
    /// Deadline applied to every inference call.
    pub inference_timeout: Duration,
    pub max_guess_retries: u32,
    pub session_capacity: usize,
    pub normalizer: NormalizerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            frontend_origins: vec![defaults::FRONTEND_URL.to_string()],
            upload_max_bytes: defaults::UPLOAD_MAX_BYTES,
            body_limit_bytes: defaults::REQUEST_BODY_LIMIT_BYTES,
            inference_timeout: Duration::from_secs(defaults::INFERENCE_TIMEOUT_SECS),
            max_guess_retries: defaults::MAX_GUESS_RETRIES,
            session_capacity: defaults::SESSION_CAPACITY,
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let upload_max_bytes =
            defaults::env_or(defaults::ENV_UPLOAD_MAX_BYTES, defaults::UPLOAD_MAX_BYTES);
        Self {
            host: std::env::var(defaults::ENV_HOST)
                .unwrap_or_else(|_| defaults::SERVER_HOST.to_string()),
            port: defaults::env_or(defaults::ENV_PORT, defaults::SERVER_PORT),
            frontend_origins: parse_origins(
                &std::env::var(defaults::ENV_FRONTEND_URL)
                    .unwrap_or_else(|_| defaults::FRONTEND_URL.to_string()),
            ),
            upload_max_bytes,
            // Leave room for the other multipart fields and framing.
            body_limit_bytes: upload_max_bytes
                + (defaults::REQUEST_BODY_LIMIT_BYTES - defaults::UPLOAD_MAX_BYTES),
            inference_timeout: Duration::from_secs(defaults::env_or(
                defaults::ENV_OPENAI_TIMEOUT,
                defaults::INFERENCE_TIMEOUT_SECS,
            )),
            max_guess_retries: defaults::env_or(
                defaults::ENV_MAX_GUESS_RETRIES,
                defaults::MAX_GUESS_RETRIES,
            ),
            session_capacity: defaults::env_or(
                defaults::ENV_SESSION_CAPACITY,
                defaults::SESSION_CAPACITY,
            )
            .max(1),
            normalizer: NormalizerConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.frontend_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.upload_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.body_limit_bytes, 6 * 1024 * 1024);
        assert_eq!(config.inference_timeout, Duration::from_secs(30));
        assert_eq!(config.max_guess_retries, 3);
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://localhost:3000/ ,https://watches.example.com,,"),
            vec!["http://localhost:3000", "https://watches.example.com"]
        );
        assert!(parse_origins("  ").is_empty());
    }
}
