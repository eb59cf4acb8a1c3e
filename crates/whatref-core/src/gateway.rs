//! Inference gateway: one deadline-bounded call plus classification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::classifier::ResultClassifier;
use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, NormalizedImage};
use crate::traits::VisionBackend;

/// Sends a normalized image and prompt to a [`VisionBackend`] and
/// classifies the answer.
///
/// No retry and no caching: every call is one independent remote request.
#[derive(Clone)]
pub struct InferenceGateway {
    backend: Arc<dyn VisionBackend>,
    classifier: ResultClassifier,
    timeout: Duration,
}

impl InferenceGateway {
    pub fn new(backend: Arc<dyn VisionBackend>, classifier: ResultClassifier) -> Self {
        Self {
            backend,
            classifier,
            timeout: Duration::from_secs(defaults::INFERENCE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend(&self) -> &Arc<dyn VisionBackend> {
        &self.backend
    }

    pub fn classifier(&self) -> &ResultClassifier {
        &self.classifier
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one attempt. The call is aborted once the deadline passes.
    #[instrument(skip(self, image, prompt), fields(
        subsystem = "inference",
        op = "analyze",
        model = %self.backend.model_name(),
        prompt_len = prompt.len(),
        image_bytes = image.len(),
    ))]
    pub async fn analyze(&self, image: &NormalizedImage, prompt: &str) -> Result<AnalysisResult> {
        if !self.backend.is_configured() {
            warn!("Inference backend has no credentials configured");
            return Err(Error::Config(defaults::MISSING_API_KEY_MESSAGE.to_string()));
        }

        let start = Instant::now();
        let raw_text = tokio::time::timeout(self.timeout, self.backend.describe_image(image, prompt))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Inference call exceeded {}s deadline",
                    self.timeout.as_secs()
                ))
            })??;

        let duration_ms = start.elapsed().as_millis() as u64;
        let classification = self.classifier.classify(&raw_text);

        info!(
            duration_ms,
            response_len = raw_text.len(),
            is_failure = classification.is_failure,
            "Inference completed"
        );
        if let Some(phrase) = &classification.matched_phrase {
            debug!(matched_phrase = %phrase, "Refusal phrase matched");
        }

        Ok(AnalysisResult {
            raw_text,
            is_failure: classification.is_failure,
            display_text: classification.display_text,
            timestamp: Utc::now(),
        })
    }
}
