//! # whatref-core
//!
//! Core types, traits, and the guess-session workflow for whatref.
//!
//! This crate holds everything that does not depend on a particular
//! model provider or storage medium: image normalization, prompt
//! construction, refusal classification, the deadline-bounded inference
//! gateway, and the per-image guess session state machine.

pub mod classifier;
pub mod defaults;
pub mod error;
pub mod gateway;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod session;
pub mod traits;

// Re-export commonly used types at crate root
pub use classifier::{Classification, FailureLexicon, ResultClassifier, DEFAULT_FAILURE_PHRASES};
pub use error::{Error, ErrorKind, Result};
pub use gateway::InferenceGateway;
pub use models::*;
pub use normalizer::{detect_mime, validate_upload, ImageNormalizer, NormalizerConfig};
pub use prompt::{build_prompt, PromptMode, BASE_PROMPT};
pub use session::{GuessSession, SessionServices, SessionSnapshot, SessionState};
pub use traits::*;
