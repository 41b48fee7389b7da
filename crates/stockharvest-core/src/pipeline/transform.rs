//! Image transform: decode, crop the bottom band, re-encode as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::{DownloadConfig, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};

/// File extension of transformed images.
pub const OUTPUT_EXTENSION: &str = "jpeg";

/// Result of transforming one image.
#[derive(Debug)]
pub struct TransformedImage {
    /// Encoded JPEG bytes
    pub bytes: Vec<u8>,
    /// Width after cropping
    pub width: u32,
    /// Height after cropping
    pub height: u32,
}

/// Crops images to the top part of their height and re-encodes them.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    crop_ratio: f64,
    jpeg_quality: u8,
    limits: LimitsConfig,
}

impl ImageTransformer {
    pub fn new(download: &DownloadConfig, limits: LimitsConfig) -> Self {
        Self {
            crop_ratio: download.crop_ratio,
            jpeg_quality: download.jpeg_quality,
            limits,
        }
    }

    /// Transform raw image bytes on the blocking pool, with a timeout.
    pub async fn transform(&self, bytes: Vec<u8>, photo_id: &str) -> PipelineResult<TransformedImage> {
        let this = self.clone();
        let id = photo_id.to_string();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let result = timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || this.transform_sync(&bytes, &id)),
        )
        .await;

        match result {
            Ok(Ok(transformed)) => transformed,
            Ok(Err(e)) => Err(PipelineError::Decode {
                photo_id: photo_id.to_string(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                photo_id: photo_id.to_string(),
                stage: "transform".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode → crop → encode.
    pub fn transform_sync(&self, bytes: &[u8], photo_id: &str) -> PipelineResult<TransformedImage> {
        let image = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode {
            photo_id: photo_id.to_string(),
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                photo_id: photo_id.to_string(),
                width,
                height,
                max_dim,
            });
        }

        let cropped = crop_top(&image, self.crop_ratio);
        let (width, height) = cropped.dimensions();
        let bytes =
            encode_jpeg(&cropped, self.jpeg_quality).map_err(|e| PipelineError::Encode {
                photo_id: photo_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(TransformedImage {
            bytes,
            width,
            height,
        })
    }
}

/// Height kept when cropping `height` pixels to `ratio`, never less than one row.
///
/// The ratio is resolved to 1/10000ths and the product computed exactly, with
/// ties rounded to even (`450 × 0.93 = 418.5` keeps 418 rows).
pub fn crop_height(height: u32, ratio: f64) -> u32 {
    const SCALE: u64 = 10_000;
    let parts = (ratio * SCALE as f64).round().max(0.0) as u64;
    let scaled = u64::from(height) * parts;
    let (whole, rest) = (scaled / SCALE, scaled % SCALE);
    let kept = if rest > SCALE / 2 || (rest == SCALE / 2 && whole % 2 == 1) {
        whole + 1
    } else {
        whole
    };
    u32::try_from(kept).unwrap_or(height).clamp(1, height.max(1))
}

/// Keep the top `ratio` of the image at full width.
pub fn crop_top(image: &DynamicImage, ratio: f64) -> DynamicImage {
    let (width, height) = image.dimensions();
    image.crop_imm(0, 0, width, crop_height(height, ratio))
}

/// Encode as baseline JPEG at the given quality. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?;
    Ok(buffer.into_inner())
}
