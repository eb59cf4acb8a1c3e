//! OpenAI-compatible vision backend.
//!
//! Works with any endpoint that accepts multimodal chat-completions
//! requests: the OpenAI cloud API, Azure OpenAI, OpenRouter, or a local
//! server such as vLLM or Ollama in OpenAI compatibility mode.
//!
//! # Example
//!
//! ```rust,no_run
//! use whatref_inference::openai::{OpenAIVisionBackend, OpenAIVisionConfig};
//! use whatref_core::VisionBackend;
//!
//! let backend = OpenAIVisionBackend::new(OpenAIVisionConfig {
//!     api_key: Some("sk-...".to_string()),
//!     model: "gpt-4o".to_string(),
//!     ..Default::default()
//! })
//! .unwrap();
//! assert!(backend.is_configured());
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIVisionBackend, OpenAIVisionConfig};
pub use error::{to_whatref_error, OpenAIErrorCode};
pub use types::*;
