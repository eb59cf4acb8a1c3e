//! Mock vision backend for deterministic testing.
//!
//! Replays scripted answers and failures in order, then falls back to a
//! default answer. Every call is logged with the prompt it received.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use whatref_inference::mock::{MockFailure, MockVisionBackend};
//!
//! let backend = MockVisionBackend::new()
//!     .with_answer("1. Reference Number: 116500LN")
//!     .with_failure(MockFailure::Upstream)
//!     .with_default_answer("1. Reference Number: 16520");
//! assert_eq!(backend.call_count(), 0);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use whatref_core::{Error, NormalizedImage, Result, VisionBackend};

/// Failure a scripted step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Timeout,
    Network,
    Upstream,
    Config,
}

impl MockFailure {
    fn to_error(self) -> Error {
        match self {
            Self::Timeout => Error::Timeout("Simulated timeout".to_string()),
            Self::Network => Error::Network("Simulated connection refused".to_string()),
            Self::Upstream => Error::Upstream("Simulated upstream failure".to_string()),
            Self::Config => Error::Config("Simulated authentication failure".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Answer(String),
    Fail(MockFailure),
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_answer: String,
    configured: bool,
    latency: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_answer: "1. Reference Number: 116500LN\n\
                             2. Brand and Model: Rolex Cosmograph Daytona"
                .to_string(),
            configured: true,
            latency: Duration::ZERO,
        }
    }
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub image_bytes: usize,
    pub mime_type: String,
}

/// Scripted [`VisionBackend`] for tests.
#[derive(Clone, Default)]
pub struct MockVisionBackend {
    config: Arc<MockConfig>,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockVisionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next unscripted call.
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        self.push(MockReply::Answer(answer.into()));
        self
    }

    /// Queue a failure for the next unscripted call.
    pub fn with_failure(self, failure: MockFailure) -> Self {
        self.push(MockReply::Fail(failure));
        self
    }

    /// Answer returned once the script is exhausted.
    pub fn with_default_answer(mut self, answer: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_answer = answer.into();
        self
    }

    /// Report missing credentials, like a backend with no API key.
    pub fn unconfigured(mut self) -> Self {
        Arc::make_mut(&mut self.config).configured = false;
        self
    }

    /// Simulated latency for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        Arc::make_mut(&mut self.config).latency = latency;
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|log| log.len()).unwrap_or_default()
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    fn push(&self, reply: MockReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.script.lock().ok().and_then(|mut s| s.pop_front())
    }
}

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn describe_image(&self, image: &NormalizedImage, prompt: &str) -> Result<String> {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(MockCall {
                prompt: prompt.to_string(),
                image_bytes: image.len(),
                mime_type: image.mime_type.clone(),
            });
        }

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        match self.next_reply() {
            Some(MockReply::Answer(answer)) => Ok(answer),
            Some(MockReply::Fail(failure)) => Err(failure.to_error()),
            None => Ok(self.config.default_answer.clone()),
        }
    }

    fn is_configured(&self) -> bool {
        self.config.configured
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
