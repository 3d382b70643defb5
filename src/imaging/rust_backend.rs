//! Pure Rust resize backend — no external process.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format detection | `image::guess_format` (magic bytes) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → other | `image::DynamicImage::write_to` in the input's format |
//!
//! The output keeps the input's format, like `convert - -resize 50% -` does.

use super::backend::{BackendError, ResizeBackend};
use super::calculations::scale_dimensions;
use super::params::{Quality, ScalePercent};
use crate::config::InternalConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::{Cursor, Read, Write};
use tracing::debug;

/// In-process backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend {
    pub scale: ScalePercent,
    pub quality: Quality,
}

impl RustBackend {
    pub fn new(scale: ScalePercent, quality: Quality) -> Self {
        Self { scale, quality }
    }

    pub fn from_config(config: &InternalConfig) -> Self {
        Self::new(
            ScalePercent::new(config.scale_percent),
            Quality::new(config.quality),
        )
    }
}

fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat), BackendError> {
    let format = image::guess_format(bytes)
        .map_err(|e| BackendError::ProcessingFailed(format!("Unrecognized image data: {e}")))?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {format:?}: {e}"))
    })?;
    Ok((img, format))
}

/// Encode `img` as `format` into `sink`.
fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
    sink: &mut (dyn Write + Send),
) -> Result<(), BackendError> {
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut *sink, quality.as_u8());
            rgb.write_with_encoder(encoder).map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to encode JPEG: {e}"))
            })?;
        }
        other => {
            // Encoders for the remaining formats need `Seek`
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, other).map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to encode {other:?}: {e}"))
            })?;
            sink.write_all(buf.get_ref())?;
        }
    }
    sink.flush()?;
    Ok(())
}

impl ResizeBackend for RustBackend {
    fn name(&self) -> &'static str {
        "internal"
    }

    fn resize(
        &self,
        source: &mut (dyn Read + Send),
        sink: &mut (dyn Write + Send),
    ) -> Result<(), BackendError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        let (img, format) = decode(&bytes)?;
        let (width, height) = scale_dimensions((img.width(), img.height()), self.scale);
        debug!(
            ?format,
            from = ?(img.width(), img.height()),
            to = ?(width, height),
            "resizing in process"
        );

        let resized = img.resize_exact(width, height, FilterType::Lanczos3);
        encode(&resized, format, self.quality, sink)
    }
}
