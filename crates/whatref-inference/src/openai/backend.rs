//! OpenAI-compatible vision backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use whatref_core::{defaults, Error, NormalizedImage, Result, VisionBackend};

use super::error::{to_whatref_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for OpenAI-compatible vision backend.
#[derive(Debug, Clone)]
pub struct OpenAIVisionConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key. Without one the backend reports itself unconfigured.
    pub api_key: Option<String>,
    /// Multimodal model to use.
    pub model: String,
    /// Upper bound on answer length.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// HTTP-Referer header for OpenRouter.ai rankings (optional).
    pub http_referer: Option<String>,
    /// X-Title header for app name on OpenRouter.ai (optional).
    pub x_title: Option<String>,
}

impl Default for OpenAIVisionConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            model: defaults::VISION_MODEL.to_string(),
            max_tokens: defaults::VISION_MAX_TOKENS,
            timeout_seconds: defaults::INFERENCE_TIMEOUT_SECS,
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenAIVisionConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(defaults::ENV_OPENAI_BASE_URL)
                .unwrap_or_else(|_| defaults::OPENAI_URL.to_string()),
            api_key: std::env::var(defaults::ENV_OPENAI_API_KEY)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var(defaults::ENV_OPENAI_VISION_MODEL)
                .unwrap_or_else(|_| defaults::VISION_MODEL.to_string()),
            max_tokens: defaults::env_or(
                defaults::ENV_OPENAI_MAX_TOKENS,
                defaults::VISION_MAX_TOKENS,
            ),
            timeout_seconds: defaults::env_or(
                defaults::ENV_OPENAI_TIMEOUT,
                defaults::INFERENCE_TIMEOUT_SECS,
            ),
            http_referer: std::env::var("OPENAI_HTTP_REFERER").ok(),
            x_title: std::env::var("OPENAI_X_TITLE").ok(),
        }
    }
}

/// Vision backend speaking the OpenAI chat-completions protocol.
pub struct OpenAIVisionBackend {
    client: Client,
    config: OpenAIVisionConfig,
}

impl OpenAIVisionBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIVisionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "openai",
            model = %config.model,
            base_url = %config.base_url,
            api_key_set = config.api_key.is_some(),
            "Initializing OpenAI vision backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIVisionConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIVisionConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        // Add OpenRouter-specific headers if configured
        if let Some(ref referer) = self.config.http_referer {
            req = req.header("HTTP-Referer", referer);
        }

        if let Some(ref title) = self.config.x_title {
            req = req.header("X-Title", title);
        }

        req.header("Content-Type", "application/json")
    }
}

#[async_trait]
impl VisionBackend for OpenAIVisionBackend {
    async fn describe_image(&self, image: &NormalizedImage, prompt: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(Error::Config(defaults::MISSING_API_KEY_MESSAGE.to_string()));
        }

        debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            image_bytes = image.len(),
            "Sending vision request"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user_with_image(prompt, image.to_data_url())],
            max_tokens: Some(self.config.max_tokens),
        };

        let start = Instant::now();
        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("error body could not be read: {}", e),
            };
            let (error_type, message) = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
                Ok(parsed) => (
                    parsed
                        .error
                        .code
                        .or(parsed.error.error_type)
                        .unwrap_or_else(|| "unknown".to_string()),
                    parsed.error.message,
                ),
                Err(_) => ("unknown".to_string(), body),
            };
            let code = OpenAIErrorCode::from_response(status.as_u16(), &error_type);
            warn!(
                status = status.as_u16(),
                error_type = %error_type,
                "Vision request rejected"
            );
            return Err(to_whatref_error(code, status.as_u16(), &message));
        }

        let result: ChatCompletionResponse = response.json().await?;

        let content = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream("OpenAI response contained no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| Error::Upstream("OpenAI response contained no content".to_string()))?;

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = content.len(),
            "Vision request complete"
        );
        Ok(content)
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
