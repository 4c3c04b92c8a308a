//! End-to-end tests through the public API: pipeline plus local store against
//! a temp upload root, with real codecs.
//!
//! Run with: cargo test --test ingest_end_to_end

use image::codecs::gif::{GifEncoder, Repeat};
use image::{DynamicImage, Frame, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use image_ingest::config::PipelineConfig;
use image_ingest::imaging::{OutputFormat, SourceFormat, is_animated_webp};
use image_ingest::naming::KeyGenerator;
use image_ingest::pipeline::{IngestError, Pipeline};
use image_ingest::policy::TranscodeDecision;
use image_ingest::store::LocalStore;
use image_ingest::types::RawUpload;
use image_ingest::validate::AdmissionError;
use rayon::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x / 12 % 256) as u8, (y / 8 % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn animated_gif(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        encoder
            .encode_frames([
                Frame::new(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]))),
                Frame::new(RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255]))),
                Frame::new(RgbaImage::from_pixel(width, height, Rgba([0, 255, 0, 255]))),
            ])
            .unwrap();
    }
    buf
}

fn animated_webp(width: u32, height: u32) -> Vec<u8> {
    let frames: Vec<DynamicImage> = [[255, 0, 0, 255], [0, 0, 255, 255]]
        .into_iter()
        .map(|px| DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(px))))
        .collect();
    let config = webp::WebPConfig::new().unwrap();
    let mut encoder = webp::AnimEncoder::new(width, height, &config);
    for (i, frame) in frames.iter().enumerate() {
        encoder.add_frame(webp::AnimFrame::from_image(frame, i as i32 * 100).unwrap());
    }
    encoder.encode().to_vec()
}

fn files_under(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().display().to_string())
        .collect()
}

#[test]
fn large_png_becomes_webp_with_bounded_thumbnail() {
    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let store = LocalStore::new(tmp.path(), "/uploads", 5);
    let upload = RawUpload::new(png(3000, 2000), "image/png", "landscape.png");

    let processed = pipeline.process(&upload).unwrap();

    assert_eq!(processed.image.format, SourceFormat::WebP);
    assert_eq!(processed.image.mime_type, "image/webp");
    assert_eq!(processed.image.source_format, SourceFormat::Png);
    assert_eq!(processed.image.decision, TranscodeDecision::ConvertTarget);
    assert_eq!((processed.image.width, processed.image.height), (3000, 2000));
    assert!(processed.key.filename.ends_with(".webp"));

    let primary = image::load_from_memory(&processed.image.primary).unwrap();
    assert_eq!(
        image::guess_format(&processed.image.primary).unwrap(),
        ImageFormat::WebP
    );
    assert_eq!(primary.dimensions(), (3000, 2000));

    let thumb = &processed.image.thumbnail;
    assert_eq!(thumb.format, OutputFormat::WebP);
    assert_eq!((thumb.width, thumb.height), (300, 200));
    let decoded_thumb = image::load_from_memory(&thumb.bytes).unwrap();
    assert_eq!(decoded_thumb.dimensions(), (300, 200));

    let record = store.persist(&processed, pipeline.keys()).unwrap();
    let relative = processed.key.relative_path();
    assert_eq!(record.url, format!("/uploads/{relative}"));
    assert_eq!(record.mime_type, "image/webp");
    assert_eq!((record.width, record.height), (3000, 2000));
    assert_eq!(
        std::fs::read(tmp.path().join(&relative)).unwrap(),
        processed.image.primary
    );
    let thumb_path = tmp
        .path()
        .join(&processed.key.directory)
        .join("thumbs")
        .join(format!("{}.webp", processed.key.stem()));
    assert!(thumb_path.exists());
}

#[test]
fn animated_gif_is_preserved_byte_for_byte() {
    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let store = LocalStore::new(tmp.path(), "/uploads", 5);
    let bytes = animated_gif(640, 480);
    let upload = RawUpload::new(bytes.clone(), "image/gif", "party.gif");

    let processed = pipeline.process(&upload).unwrap();

    assert_eq!(processed.image.decision, TranscodeDecision::Preserve);
    assert_eq!(processed.image.primary, bytes);
    assert_eq!(processed.image.format, SourceFormat::Gif);
    assert_eq!(processed.image.mime_type, "image/gif");
    assert!(processed.key.filename.ends_with(".gif"));

    let thumb = &processed.image.thumbnail;
    assert_eq!(thumb.format, OutputFormat::Jpeg);
    assert_eq!(image::guess_format(&thumb.bytes).unwrap(), ImageFormat::Jpeg);
    assert_eq!((thumb.width, thumb.height), (300, 225));

    let record = store.persist(&processed, pipeline.keys()).unwrap();
    assert!(record.thumbnail_url.ends_with(".jpg"));
    assert_eq!(
        std::fs::read(tmp.path().join(processed.key.relative_path())).unwrap(),
        bytes
    );
}

#[test]
fn animated_webp_keeps_every_frame() {
    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let store = LocalStore::new(tmp.path(), "/uploads", 5);
    let bytes = animated_webp(400, 200);
    assert!(is_animated_webp(&bytes));
    let upload = RawUpload::new(bytes.clone(), "image/webp", "loop.webp");

    let processed = pipeline.process(&upload).unwrap();

    assert_eq!(processed.image.decision, TranscodeDecision::Preserve);
    assert_eq!(processed.image.primary, bytes);
    assert_eq!(processed.image.mime_type, "image/webp");
    assert_eq!(processed.image.thumbnail.format, OutputFormat::Jpeg);
    assert_eq!(
        (processed.image.thumbnail.width, processed.image.thumbnail.height),
        (300, 150)
    );

    let record = store.persist(&processed, pipeline.keys()).unwrap();
    assert!(record.filename.ends_with(".webp"));
    assert!(record.thumbnail_url.ends_with(".jpg"));
    let stored = std::fs::read(tmp.path().join(processed.key.relative_path())).unwrap();
    assert!(is_animated_webp(&stored));
}

#[test]
fn garbage_bytes_fail_decode_and_write_nothing() {
    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let store = LocalStore::new(tmp.path(), "/uploads", 5);
    let uploads = vec![RawUpload::new(
        b"definitely not an image, just some text".to_vec(),
        "image/png",
        "fake.png",
    )];

    let outcomes = pipeline
        .process_batch_with(&uploads, None, |pipeline, processed| {
            store
                .persist(&processed, pipeline.keys())
                .map_err(IngestError::from)
        })
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0].result, Err(IngestError::Decode(_))));
    assert!(files_under(tmp.path()).is_empty());
}

#[test]
fn oversized_declaration_is_rejected() {
    let pipeline = Pipeline::new(PipelineConfig::default());
    let upload = RawUpload::new(png(16, 16), "image/png", "huge.png")
        .with_declared_size(10 * 1024 * 1024 + 1);

    let err = pipeline.process(&upload).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Admission(AdmissionError::SizeExceeded { .. })
    ));
}

#[test]
fn stored_batch_lands_in_one_partition() {
    let tmp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default());
    let store = LocalStore::new(tmp.path(), "/uploads", 5);
    let uploads: Vec<RawUpload> = (0..6)
        .map(|i| RawUpload::new(png(40 + i, 30), "image/png", format!("{i}.png")))
        .collect();

    let outcomes = pipeline
        .process_batch_with(&uploads, None, |pipeline, processed| {
            store
                .persist(&processed, pipeline.keys())
                .map_err(IngestError::from)
        })
        .unwrap();

    let urls: HashSet<String> = outcomes
        .into_iter()
        .map(|o| o.result.unwrap().url)
        .collect();
    assert_eq!(urls.len(), 6);
    // 6 primaries + 6 thumbnails
    assert_eq!(files_under(tmp.path()).len(), 12);
}

#[test]
fn concurrent_key_generation_is_unique() {
    let keys = KeyGenerator::new();

    let names: Vec<String> = (0..1000)
        .into_par_iter()
        .map(|_| keys.generate("webp"))
        .collect();

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 1000);
}
