//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (WebP, tried first) | `webp::Decoder` |
//! | Decode (GIF, PNG) | `image::load_from_memory_with_format` |
//! | Decode (anything else) | `image::guess_format` signature dispatch |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → WebP (lossy) | `webp::Encoder::encode_simple` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! ## Decode order
//!
//! Decoders are tried in a fixed order and the first success wins:
//!
//! 1. WebP: the normalized format, so re-uploads of already converted
//!    images hit on the first attempt.
//! 2. GIF: special format, must be tagged as such to be preserved.
//! 3. PNG
//! 4. Generic: dispatch on the embedded signature (JPEG, TIFF, animated WebP, ...).
//!
//! Animated WebP only decodes through the generic path. Its first frame is
//! returned with [`DecodedImage::animated`] set so the policy can keep the
//! original bytes.
//!
//! Changing the order changes which tag ambiguous buffers receive.

use super::backend::{DecodeError, DecodedImage, EncodeError, ImageBackend};
use super::format::{OutputFormat, SourceFormat, is_animated_webp};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use tracing::debug;

/// Resampling kernel for every resize. Changing it changes visual baselines.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

type DecodeFn = fn(&[u8]) -> Result<DecodedImage, String>;

/// The decoder chain, in priority order.
const DECODE_CHAIN: &[(&str, DecodeFn)] = &[
    ("webp", decode_webp),
    ("gif", decode_gif),
    ("png", decode_png),
    ("generic", decode_by_signature),
];

/// Pure Rust backend using the `image` and `webp` crates.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_webp(bytes: &[u8]) -> Result<DecodedImage, String> {
    webp::Decoder::new(bytes)
        .decode()
        .map(|img| DecodedImage::new(img.to_image(), SourceFormat::WebP))
        .ok_or_else(|| "not a still WebP bitstream".to_string())
}

fn decode_as(bytes: &[u8], format: ImageFormat) -> Result<DecodedImage, String> {
    image::load_from_memory_with_format(bytes, format)
        .map(|image| {
            // Only the first frame is decoded; remember that there were more.
            let animated = format == ImageFormat::WebP && is_animated_webp(bytes);
            DecodedImage::new(image, SourceFormat::from_image_format(format))
                .with_animation(animated)
        })
        .map_err(|e| e.to_string())
}

fn decode_gif(bytes: &[u8]) -> Result<DecodedImage, String> {
    decode_as(bytes, ImageFormat::Gif)
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, String> {
    decode_as(bytes, ImageFormat::Png)
}

fn decode_by_signature(bytes: &[u8]) -> Result<DecodedImage, String> {
    let format = image::guess_format(bytes).map_err(|e| e.to_string())?;
    decode_as(bytes, format)
}

/// Run the decoder chain over `bytes`.
pub fn decode_chain(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let mut last_reason = String::new();
    for (name, decode) in DECODE_CHAIN {
        match decode(bytes) {
            Ok(decoded) => {
                debug!(
                    decoder = name,
                    format = %decoded.format,
                    width = decoded.width(),
                    height = decoded.height(),
                    "decoded upload"
                );
                return Ok(decoded);
            }
            Err(reason) => {
                debug!(decoder = name, %reason, "decoder rejected upload");
                last_reason = reason;
            }
        }
    }
    Err(DecodeError {
        tried: DECODE_CHAIN.len(),
        last_reason,
    })
}

fn codec_error(format: OutputFormat, reason: impl ToString) -> EncodeError {
    EncodeError::Codec {
        format,
        reason: reason.to_string(),
    }
}

/// Lossy WebP via libwebp. The encoder only accepts 8-bit RGB/RGBA input.
fn encode_webp(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let prepared: Cow<'_, DynamicImage> = match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    };

    let encoder = webp::Encoder::from_image(&prepared)
        .map_err(|e| codec_error(OutputFormat::WebP, e))?;
    let encoded = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| codec_error(OutputFormat::WebP, format!("{e:?}")))?;
    Ok(encoded.to_vec())
}

/// Baseline JPEG. Alpha is dropped; JPEG has no alpha channel.
fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| codec_error(OutputFormat::Jpeg, e))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        decode_chain(bytes)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        match format {
            OutputFormat::WebP => encode_webp(image, quality),
            OutputFormat::Jpeg => encode_jpeg(image, quality),
        }
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, RESIZE_FILTER)
    }
}
