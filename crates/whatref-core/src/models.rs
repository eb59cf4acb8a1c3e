//! Data model shared across whatref crates.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// IMAGES
// =============================================================================

/// Raw upload as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    /// Media type declared by the client, if any.
    pub declared_mime: Option<String>,
    /// Original filename, if any.
    pub filename: Option<String>,
}

impl UploadedImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            declared_mime: None,
            filename: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Image re-encoded within the configured bounds, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    /// `data:<mime>;base64,<payload>` form used in multimodal requests.
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type, encoded)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of one inference attempt after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unmodified answer from the model.
    pub raw_text: String,
    pub is_failure: bool,
    /// `raw_text` for identifications, the fixed fallback for refusals.
    pub display_text: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Raw text of a non-failure result.
    pub result: String,
    /// Data URL of a small JPEG of the analyzed image.
    pub thumbnail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build an entry from a successful result.
    ///
    /// Returns `None` for results classified as failures; those never
    /// reach the history.
    pub fn from_result(result: &AnalysisResult, thumbnail: Option<String>) -> Option<Self> {
        if result.is_failure {
            return None;
        }
        Some(Self {
            id: Uuid::now_v7(),
            result: result.raw_text.clone(),
            thumbnail,
            timestamp: result.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(raw: &str, is_failure: bool) -> AnalysisResult {
        AnalysisResult {
            raw_text: raw.to_string(),
            is_failure,
            display_text: raw.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_data_url_prefix() {
        let image = NormalizedImage {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
            width: 1,
            height: 1,
        };
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_history_entry_rejects_failures() {
        assert!(HistoryEntry::from_result(&result("I'm sorry", true), None).is_none());
    }

    #[test]
    fn test_history_entry_keeps_raw_text_and_timestamp() {
        let r = result("1. Reference Number: 116500LN", false);
        let entry = HistoryEntry::from_result(&r, Some("data:image/jpeg;base64,AA==".into()))
            .expect("success result should produce an entry");
        assert_eq!(entry.result, r.raw_text);
        assert_eq!(entry.timestamp, r.timestamp);
        assert!(entry.thumbnail.is_some());
    }

    #[test]
    fn test_analysis_result_serializes_camel_case() {
        let json = serde_json::to_value(result("x", false)).unwrap();
        assert!(json.get("rawText").is_some());
        assert!(json.get("isFailure").is_some());
        assert!(json.get("displayText").is_some());
    }

    #[test]
    fn test_uploaded_image_builders() {
        let upload = UploadedImage::new(vec![1, 2, 3])
            .with_mime("image/png")
            .with_filename("watch.png");
        assert_eq!(upload.len(), 3);
        assert_eq!(upload.declared_mime.as_deref(), Some("image/png"));
        assert_eq!(upload.filename.as_deref(), Some("watch.png"));
    }
}
