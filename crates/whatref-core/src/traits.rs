//! Core traits for whatref abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{HistoryEntry, NormalizedImage};

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend answering a text prompt about an image with a multimodal model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Send one prompt + image and return the model's free-text answer.
    ///
    /// Implementations perform exactly one remote call and never retry.
    async fn describe_image(&self, image: &NormalizedImage, prompt: &str) -> Result<String>;

    /// Whether the credentials needed for `describe_image` are present.
    fn is_configured(&self) -> bool;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// HISTORY
// =============================================================================

/// Bounded, ordered record of past successful analyses.
///
/// Implementations serialize concurrent appends and enforce the cap in the
/// same critical section as the append.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert an entry at the front, evicting the oldest past the cap.
    async fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// Newest-first entries, at most `limit` (all when `None`).
    async fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}
