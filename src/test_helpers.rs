//! Shared test utilities for the image-ingest test suite.
//!
//! Fixture builders encode small synthetic images in memory so tests never
//! depend on files checked into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let upload = upload("photo.png", "image/png", png_bytes(640, 480));
//! let processed = pipeline.process(&upload).unwrap();
//! ```

use crate::types::RawUpload;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{DynamicImage, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Raster builders
// =========================================================================

/// Opaque RGB gradient. Non-flat content keeps lossy encoders honest.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn encode_as(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

// =========================================================================
// Encoded fixtures
// =========================================================================

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_as(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

/// PNG with a transparent left half.
pub fn rgba_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, alpha])
    });
    encode_as(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_as(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

pub fn tiff_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_as(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Tiff)
}

/// Lossy WebP via libwebp, the same encoder production uses.
pub fn webp_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(gradient(width, height));
    let encoder = webp::Encoder::from_image(&img).unwrap();
    encoder.encode(75.0).to_vec()
}

/// Looping GIF with `frames` frames of alternating colors.
pub fn animated_gif_bytes(width: u32, height: u32, frames: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        let frames = (0..frames).map(|i| {
            let shade = if i % 2 == 0 { 32 } else { 224 };
            Frame::new(RgbaImage::from_pixel(
                width,
                height,
                Rgba([shade, 255 - shade, 64, 255]),
            ))
        });
        encoder.encode_frames(frames).unwrap();
    }
    buf
}

/// Looping animated WebP with `frames` frames of alternating colors.
pub fn animated_webp_bytes(width: u32, height: u32, frames: u32) -> Vec<u8> {
    let images: Vec<DynamicImage> = (0..frames)
        .map(|i| {
            let shade = if i % 2 == 0 { 32 } else { 224 };
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                width,
                height,
                Rgba([shade, 255 - shade, 64, 255]),
            ))
        })
        .collect();

    let config = webp::WebPConfig::new().unwrap();
    let mut encoder = webp::AnimEncoder::new(width, height, &config);
    for (i, image) in images.iter().enumerate() {
        encoder.add_frame(webp::AnimFrame::from_image(image, i as i32 * 100).unwrap());
    }
    encoder.encode().to_vec()
}

// =========================================================================
// Upload builders
// =========================================================================

/// Build a [`RawUpload`] whose declared size is the real byte length.
pub fn upload(filename: &str, content_type: &str, bytes: Vec<u8>) -> RawUpload {
    RawUpload::new(bytes, content_type, filename)
}
