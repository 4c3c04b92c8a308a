//! High-level image operations.
//!
//! These functions combine the transcode decision and dimension math with
//! backend execution. They take configuration, compute parameters, and call
//! the backend.

use super::backend::{DecodedImage, EncodeError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::format::{OutputFormat, SourceFormat, TARGET_FORMAT};
use super::params::{Quality, ThumbnailBox};
use crate::policy::TranscodeDecision;
use crate::types::Thumbnail;
use image::DynamicImage;
use std::borrow::Cow;
use tracing::debug;

/// Configuration for the primary asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryConfig {
    pub quality: Quality,
    /// WebP uploads larger than this many bytes are re-encoded; smaller ones
    /// are stored verbatim.
    pub recompress_threshold: u64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            quality: Quality::new(85),
            recompress_threshold: 1024 * 1024,
        }
    }
}

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    pub bounds: ThumbnailBox,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            bounds: ThumbnailBox::default(),
            quality: Quality::new(80),
        }
    }
}

/// Primary asset produced by executing a [`TranscodeDecision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryAsset {
    pub bytes: Vec<u8>,
    pub format: SourceFormat,
}

/// Execute a transcode decision for the primary asset.
///
/// `original` is the upload's raw bytes; it is returned verbatim for
/// [`Preserve`](TranscodeDecision::Preserve) and for WebP uploads at or below
/// the recompress threshold.
pub fn transcode_primary(
    backend: &impl ImageBackend,
    decoded: &DecodedImage,
    original: &[u8],
    decision: TranscodeDecision,
    config: &PrimaryConfig,
) -> Result<PrimaryAsset, EncodeError> {
    let target = TARGET_FORMAT.source_format();
    match decision {
        TranscodeDecision::Preserve => Ok(PrimaryAsset {
            bytes: original.to_vec(),
            format: decoded.format,
        }),
        TranscodeDecision::RecompressSame if original.len() as u64 <= config.recompress_threshold => {
            debug!(
                size = original.len(),
                threshold = config.recompress_threshold,
                "under recompress threshold, keeping bytes"
            );
            Ok(PrimaryAsset {
                bytes: original.to_vec(),
                format: target,
            })
        }
        TranscodeDecision::RecompressSame | TranscodeDecision::ConvertTarget => {
            let bytes = backend.encode(&decoded.image, TARGET_FORMAT, config.quality)?;
            Ok(PrimaryAsset {
                bytes,
                format: target,
            })
        }
    }
}

/// Plan the thumbnail dimensions for a raster without touching pixels.
pub fn plan_thumbnail(source: (u32, u32), config: &ThumbnailConfig) -> (u32, u32) {
    calculate_fit_dimensions(source, config.bounds.as_tuple())
}

/// Create a thumbnail from the decoded raster.
///
/// Fits the raster inside the configured box with the backend's resampler,
/// then encodes it in `format`. Rasters already inside the box are encoded at
/// their own size without resampling.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    config: &ThumbnailConfig,
) -> Result<Thumbnail, EncodeError> {
    let source = (image.width(), image.height());
    let (width, height) = plan_thumbnail(source, config);

    let fitted: Cow<'_, DynamicImage> = if (width, height) == source {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(backend.resize(image, width, height))
    };

    let bytes = backend.encode(&fitted, format, config.quality)?;
    debug!(width, height, %format, size = bytes.len(), "thumbnail encoded");

    Ok(Thumbnail {
        bytes,
        format,
        width,
        height,
    })
}
