//! HTTP handlers for whatref-api.

pub mod analyze;
pub mod health;
pub mod history;
pub mod sessions;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use whatref_core::UploadedImage;

use crate::ApiError;

/// Fields of an image upload form.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub image: Option<UploadedImage>,
    /// `guessAgain` was sent as `"true"`.
    pub guess_again: bool,
    pub previous_guesses: Vec<String>,
    pub user_info: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".to_string())
    } else {
        ApiError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

/// Read an image upload form, rejecting an `image` field over `max_bytes`.
///
/// Unknown fields are ignored. An unparseable `previousGuesses` value is
/// treated as no previous guesses.
pub async fn read_image_form(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageForm, ApiError> {
    let mut form = ImageForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("image") => {
                let declared_mime = field.content_type().map(|c| c.to_string());
                let filename = field.file_name().map(|f| f.to_string());

                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if data.len() + chunk.len() > max_bytes {
                        return Err(ApiError::PayloadTooLarge("File too large".to_string()));
                    }
                    data.extend_from_slice(&chunk);
                }

                let mut upload = UploadedImage::new(data);
                upload.declared_mime = declared_mime;
                upload.filename = filename;
                form.image = Some(upload);
            }
            Some("guessAgain") => {
                form.guess_again = field.text().await.map_err(multipart_error)?.trim() == "true";
            }
            Some("previousGuesses") => {
                let raw = field.text().await.map_err(multipart_error)?;
                form.previous_guesses = serde_json::from_str(&raw).unwrap_or_else(|e| {
                    tracing::debug!(subsystem = "api", error = %e, "Ignoring unparseable previousGuesses");
                    Vec::new()
                });
            }
            Some("userInfo") => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    form.user_info = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Take the uploaded image or fail with the missing-file error.
pub fn require_image(form: &mut ImageForm) -> Result<UploadedImage, ApiError> {
    form.image
        .take()
        .filter(|upload| !upload.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))
}
