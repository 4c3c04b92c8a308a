//! # Image Ingest
//!
//! Turns untrusted image uploads into a normalized, web-ready primary asset,
//! a bounded thumbnail, and a collision-safe storage key.
//!
//! # Architecture: One Linear Pass Per Upload
//!
//! ```text
//! RawUpload
//!   1. Validate   declared size + content-type     (no decoding yet)
//!   2. Decode     fixed decoder chain              (bytes are the truth)
//!   3. Decide     preserve / recompress / convert  (policy)
//!   4. Encode     primary asset                    (WebP @ 85 unless preserved)
//!   5. Thumbnail  fit in 300x300, Lanczos3         (JPEG for preserved, WebP otherwise)
//!   6. Name       time-sortable random filename    (under {year}/{month}/)
//! ProcessedUpload  →  LocalStore  →  ImageRecord
//! ```
//!
//! Each stage either produces its output or fails the whole upload with a
//! typed error. Nothing is retried inside the pipeline and no partial output
//! escapes. Batches run their files in parallel; one failing file never
//! affects another.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Admission checks on client-declared size and content-type |
//! | [`imaging`] | Format sniffing, decode chain, encoders, resize, thumbnail math |
//! | [`policy`] | Transcode decision: preserve, recompress-same, convert-target |
//! | [`naming`] | Storage key generation (`{year}/{month}/{tick}{random}.{ext}`) |
//! | [`pipeline`] | [`Pipeline`](pipeline::Pipeline): wires the stages, runs batches |
//! | [`store`] | Atomic, no-clobber writes to the upload root |
//! | [`config`] | `ingest.toml` loading, validation, merging over stock defaults |
//! | [`types`] | Upload and result types passed between the stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Over Claims
//!
//! The declared content-type is only used for admission and as a policy hint.
//! The format reported to callers, the stored mime type and the key's
//! extension are all derived from what the decoder recognized (or from the
//! format the primary was re-encoded into).
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and JPEG encoding use the `image` crate. Lossy WebP
//! goes through `webp` (libwebp), since `image` only writes lossless WebP.
//!
//! ## Explicit Dependencies
//!
//! A [`Pipeline`](pipeline::Pipeline) is built from a backend, a
//! [`PipelineConfig`](config::PipelineConfig) and its own
//! [`KeyGenerator`](naming::KeyGenerator). There is no global state, so tests
//! swap in a recording mock backend and assert on exactly which pixel
//! operations ran.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod store;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
