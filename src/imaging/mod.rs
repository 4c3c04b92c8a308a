//! Image processing: decode, transcode, resize, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` |
//! | **Decode** | fixed chain: `webp` → GIF → PNG → signature dispatch |
//! | **Encode** | lossy WebP (`webp`), JPEG (`image`) |
//! | **Thumbnail** | fit-in-box + Lanczos3 `resize_exact` |
//!
//! The module is split into:
//! - **Format**: Source/output format tags and byte-signature sniffing
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and bounding-box types
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Primary transcode and thumbnail generation over a backend

pub mod backend;
mod calculations;
pub mod format;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{DecodeError, DecodedImage, EncodeError, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use format::{OutputFormat, SourceFormat, TARGET_FORMAT, is_animated_webp, sniff};
pub use operations::{
    PrimaryAsset, PrimaryConfig, ThumbnailConfig, create_thumbnail, plan_thumbnail,
    transcode_primary,
};
pub use params::{Quality, ThumbnailBox};
pub use rust_backend::RustBackend;
