//! Data handed into and out of the pipeline.
//!
//! [`RawUpload`] is what the HTTP layer receives; [`ProcessedUpload`] is what
//! the persistence layer gets back. Neither holds a decoded raster: rasters
//! live only inside a single [`Pipeline::process`](crate::pipeline::Pipeline::process)
//! call.

use crate::imaging::{OutputFormat, SourceFormat};
use crate::naming::StorageKey;
use crate::policy::TranscodeDecision;

/// An upload as received: bytes plus everything the client claims about them.
///
/// `content_type`, `declared_size` and `filename` are all client-controlled.
/// They drive admission and policy hints only.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub declared_size: u64,
    pub filename: String,
}

impl RawUpload {
    /// Build an upload whose declared size matches the byte length.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            declared_size: bytes.len() as u64,
            bytes,
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }

    /// Override the declared size (multipart headers can disagree with the body).
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }
}

/// Encoded thumbnail and the format it was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Pipeline output for a single image.
///
/// `width`/`height` are the decoded raster's bounds, never the client's
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub primary: Vec<u8>,
    pub thumbnail: Thumbnail,
    pub width: u32,
    pub height: u32,
    /// Format the primary bytes are encoded in.
    pub format: SourceFormat,
    pub mime_type: &'static str,
    /// Format the upload was decoded from.
    pub source_format: SourceFormat,
    pub decision: TranscodeDecision,
}

/// A processed image plus the storage key generated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedUpload {
    pub original_filename: String,
    pub image: ProcessedImage,
    pub key: StorageKey,
}
