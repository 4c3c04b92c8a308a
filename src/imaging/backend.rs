//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations the pipeline
//! needs: decode, encode, and resize. Everything above it (transcode policy,
//! thumbnail planning, naming) is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use a recording
//! mock so call order and "no decode after rejection" can be asserted.

use super::format::{OutputFormat, SourceFormat};
use super::params::Quality;
use image::DynamicImage;
use thiserror::Error;

/// Every decoder in the chain rejected the bytes.
#[derive(Error, Debug)]
#[error("content could not be recognized as any supported image format ({tried} decoders tried)")]
pub struct DecodeError {
    /// Number of decoders attempted before giving up.
    pub tried: usize,
    /// Rejection reason from the last decoder in the chain.
    pub last_reason: String,
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{format} encode failed: {reason}")]
    Codec {
        format: OutputFormat,
        reason: String,
    },
}

/// A decoded raster together with the format it was decoded from.
///
/// Owned by a single pipeline invocation and dropped once the primary and
/// thumbnail encodes are done. For animated sources `image` holds the first
/// frame only.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: SourceFormat,
    /// The source carries more than one frame.
    pub animated: bool,
}

impl DecodedImage {
    pub fn new(image: DynamicImage, format: SourceFormat) -> Self {
        Self {
            image,
            format,
            animated: false,
        }
    }

    pub fn with_animation(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: a single backend instance is shared by
/// every file of a parallel batch.
pub trait ImageBackend: Sync {
    /// Decode raw bytes, reporting which format won.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;

    /// Encode a raster into `format`. Returns the complete encoded buffer or
    /// an error; never a partial buffer.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;
}
