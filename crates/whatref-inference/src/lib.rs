//! # whatref-inference
//!
//! Vision model backends for whatref.
//!
//! This crate provides:
//! - OpenAI-compatible multimodal chat-completions backend (feature `openai`, default)
//! - Scripted mock backend (feature `mock`)
//!
//! Both implement [`whatref_core::VisionBackend`].

#[cfg(feature = "openai")]
pub mod openai;

// Mock vision backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "openai")]
pub use openai::{OpenAIVisionBackend, OpenAIVisionConfig};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockFailure, MockVisionBackend};
