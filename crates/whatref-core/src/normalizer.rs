//! Image normalization: decode, bound, and re-encode uploads as JPEG.
//!
//! Every image sent upstream passes through [`ImageNormalizer::normalize`],
//! which guarantees the longer edge is at most `max_dimension` and makes a
//! best effort to stay under `max_bytes`.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{NormalizedImage, UploadedImage};

/// Formats accepted from clients, by sniffed MIME type.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Output MIME type of every normalized image.
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// Bounds applied to uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub max_dimension: u32,
    pub max_bytes: usize,
    pub jpeg_quality: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_dimension: defaults::IMAGE_MAX_DIMENSION,
            max_bytes: defaults::IMAGE_MAX_BYTES,
            jpeg_quality: defaults::IMAGE_JPEG_QUALITY,
        }
    }
}

impl NormalizerConfig {
    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            max_dimension: defaults::env_or(
                defaults::ENV_IMAGE_MAX_DIMENSION,
                defaults::IMAGE_MAX_DIMENSION,
            )
            .max(1),
            max_bytes: defaults::env_or(defaults::ENV_IMAGE_MAX_BYTES, defaults::IMAGE_MAX_BYTES),
            jpeg_quality: defaults::env_or(
                defaults::ENV_IMAGE_JPEG_QUALITY,
                defaults::IMAGE_JPEG_QUALITY,
            )
            .clamp(1, 100),
        }
    }
}

/// Sniff the real format of `data` from its magic bytes.
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// Check the upload against the allow-list before decoding.
pub fn validate_upload(upload: &UploadedImage) -> Result<&'static str> {
    if upload.is_empty() {
        return Err(Error::Validation("No image file provided".to_string()));
    }
    match detect_mime(&upload.data) {
        Some(mime) if ALLOWED_MIME_TYPES.contains(&mime) => Ok(mime),
        Some(mime) => Err(Error::Validation(format!(
            "Unsupported image format: {}. Only JPEG, PNG and WebP images are allowed",
            mime
        ))),
        None => Err(Error::Validation(
            "Only image files are allowed (JPEG, PNG, WebP)".to_string(),
        )),
    }
}

/// Pure image transform with fixed bounds.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: NormalizerConfig,
}

impl ImageNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Decode, downscale, and re-encode an upload.
    pub fn normalize(&self, upload: &UploadedImage) -> Result<NormalizedImage> {
        let detected = validate_upload(upload)?;
        if let Some(declared) = upload.declared_mime.as_deref() {
            if !declared.eq_ignore_ascii_case(detected) {
                debug!(
                    subsystem = "image",
                    component = "normalizer",
                    declared_mime = declared,
                    detected_mime = detected,
                    filename = upload.filename.as_deref().unwrap_or(""),
                    "Declared type differs from content, using sniffed type"
                );
            }
        }
        let decoded = image::load_from_memory(&upload.data)
            .map_err(|e| Error::Normalization(format!("Could not decode {}: {}", detected, e)))?;

        let (width, height) = decoded.dimensions();
        let resized = fit_within(decoded, self.config.max_dimension);
        let rgb = flatten_alpha(&resized);

        let mut data = encode_jpeg(&rgb, self.config.jpeg_quality)?;
        if data.len() > self.config.max_bytes {
            let quality = defaults::IMAGE_FALLBACK_JPEG_QUALITY.min(self.config.jpeg_quality);
            debug!(
                subsystem = "image",
                component = "normalizer",
                image_bytes = data.len(),
                max_bytes = self.config.max_bytes,
                quality,
                "Over byte budget, re-encoding at lower quality"
            );
            data = encode_jpeg(&rgb, quality)?;
            if data.len() > self.config.max_bytes {
                warn!(
                    subsystem = "image",
                    component = "normalizer",
                    image_bytes = data.len(),
                    max_bytes = self.config.max_bytes,
                    "Byte budget not met, sending best-effort image"
                );
            }
        }

        debug!(
            subsystem = "image",
            component = "normalizer",
            op = "normalize",
            source_mime = detected,
            source_width = width,
            source_height = height,
            width = rgb.width(),
            height = rgb.height(),
            image_bytes = data.len(),
            "Image normalized"
        );

        Ok(NormalizedImage {
            width: rgb.width(),
            height: rgb.height(),
            data,
            mime_type: OUTPUT_MIME_TYPE.to_string(),
        })
    }

    /// [`normalize`](Self::normalize) on the blocking thread pool.
    pub async fn normalize_async(&self, upload: UploadedImage) -> Result<NormalizedImage> {
        let normalizer = self.clone();
        tokio::task::spawn_blocking(move || normalizer.normalize(&upload))
            .await
            .map_err(|e| Error::Internal(format!("Image normalization task failed: {}", e)))?
    }

    /// Small JPEG data URL of an already-normalized image, for history.
    pub fn thumbnail(&self, image: &NormalizedImage) -> Result<String> {
        let decoded = image::load_from_memory(&image.data)
            .map_err(|e| Error::Normalization(format!("Could not decode thumbnail source: {}", e)))?;
        let small = fit_within(decoded, defaults::THUMBNAIL_MAX_DIMENSION);
        let data = encode_jpeg(&flatten_alpha(&small), self.config.jpeg_quality)?;
        Ok(NormalizedImage {
            width: small.width(),
            height: small.height(),
            data,
            mime_type: OUTPUT_MIME_TYPE.to_string(),
        }
        .to_data_url())
    }
}

/// Downscale so the longer edge is at most `max_dimension`; never upscale.
fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width.max(height) <= max_dimension {
        return image;
    }
    // `resize` preserves aspect ratio within the bounding box.
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
}

/// Composite onto white so transparent PNG/WebP regions don't turn black.
fn flatten_alpha(image: &DynamicImage) -> image::RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    DynamicImage::ImageRgba8(flattened).to_rgb8()
}

fn encode_jpeg(image: &image::RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(image)
        .map_err(|e| Error::Normalization(format!("JPEG encoding failed: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn transparent_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_large_image_is_downscaled_preserving_aspect_ratio() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_dimension: 400,
            ..Default::default()
        });
        let out = normalizer
            .normalize(&UploadedImage::new(png_bytes(1600, 800)))
            .unwrap();

        assert_eq!(out.width, 400);
        assert_eq!(out.height, 200);
        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(detect_mime(&out.data), Some("image/jpeg"));
    }

    #[test]
    fn test_portrait_image_bounded_on_height() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_dimension: 300,
            ..Default::default()
        });
        let out = normalizer
            .normalize(&UploadedImage::new(png_bytes(600, 1200)))
            .unwrap();

        assert_eq!(out.height, 300);
        assert_eq!(out.width, 150);
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let out = ImageNormalizer::default()
            .normalize(&UploadedImage::new(png_bytes(64, 48)))
            .unwrap();
        assert_eq!((out.width, out.height), (64, 48));
    }

    #[test]
    fn test_transparent_pixels_flattened_to_white() {
        let out = ImageNormalizer::default()
            .normalize(&UploadedImage::new(transparent_png(16, 16)))
            .unwrap();
        let decoded = image::load_from_memory(&out.data).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(8, 8);
        assert!(pixel[0] > 240 && pixel[1] > 240 && pixel[2] > 240);
    }

    #[test]
    fn test_output_within_byte_budget() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_dimension: 256,
            max_bytes: 200 * 1024,
            jpeg_quality: 80,
        });
        let out = normalizer
            .normalize(&UploadedImage::new(png_bytes(1024, 1024)))
            .unwrap();
        assert!(out.len() <= 200 * 1024);
    }

    #[test]
    fn test_mislabelled_upload_uses_sniffed_type() {
        let upload = UploadedImage::new(png_bytes(40, 30))
            .with_mime("image/jpeg")
            .with_filename("watch.jpg");
        let out = ImageNormalizer::default().normalize(&upload).unwrap();
        assert_eq!((out.width, out.height), (40, 30));
    }

    #[test]
    fn test_spoofed_mime_does_not_bypass_allow_list() {
        let upload =
            UploadedImage::new(b"GIF89a\x01\x00\x01\x00".to_vec()).with_mime("image/png");
        let err = ImageNormalizer::default().normalize(&upload).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_empty_upload_is_validation_error() {
        let err = ImageNormalizer::default()
            .normalize(&UploadedImage::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_non_image_rejected_before_decoding() {
        let err = ImageNormalizer::default()
            .normalize(&UploadedImage::new(b"%PDF-1.7 not a watch".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_truncated_png_is_normalization_error() {
        let mut bytes = png_bytes(32, 32);
        bytes.truncate(40);
        let err = ImageNormalizer::default()
            .normalize(&UploadedImage::new(bytes))
            .unwrap_err();
        assert!(matches!(err, Error::Normalization(_)));
    }

    #[test]
    fn test_thumbnail_is_small_jpeg_data_url() {
        let normalizer = ImageNormalizer::default();
        let image = normalizer
            .normalize(&UploadedImage::new(png_bytes(1000, 500)))
            .unwrap();
        let thumb = normalizer.thumbnail(&image).unwrap();
        assert!(thumb.starts_with("data:image/jpeg;base64,"));
        assert!(thumb.len() < image.to_data_url().len());
    }
}
