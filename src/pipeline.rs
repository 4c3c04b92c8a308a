//! The ingestion pipeline.
//!
//! One linear pass per upload, no retries, no state carried between calls:
//!
//! ```text
//! validate → decode → decide → encode primary → fit + encode thumbnail → name
//! ```
//!
//! A [`Pipeline`] is constructed explicitly with its backend, configuration
//! and key generator, then shared by reference. It holds no mutable state of
//! its own, so a batch is processed in parallel with [rayon](https://docs.rs/rayon)
//! and each file succeeds or fails on its own.
//!
//! Decoded rasters never leave [`Pipeline::process`]; they are dropped as soon
//! as the primary and thumbnail encodes finish.

use crate::config::PipelineConfig;
use crate::imaging::{
    DecodeError, DecodedImage, EncodeError, ImageBackend, RustBackend, create_thumbnail,
    transcode_primary,
};
use crate::naming::{KeyGenerator, StorageKey};
use crate::policy::{self, TranscodeDecision};
use crate::store::StoreError;
use crate::types::{ProcessedImage, ProcessedUpload, RawUpload};
use crate::validate::{AdmissionError, validate};
use chrono::Local;
use rayon::prelude::*;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything that can go wrong with a single file.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("file validation failed: {0}")]
    Admission(#[from] AdmissionError),
    #[error("failed to decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to encode image: {0}")]
    Encode(#[from] EncodeError),
    #[error("failed to store image: {0}")]
    Store(#[from] StoreError),
}

/// Failures that reject a whole batch before any file is touched.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    #[error("no files in batch")]
    Empty,
    #[error("at most {max} files per batch, got {got}")]
    TooManyFiles { max: usize, got: usize },
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    Started {
        index: usize,
        filename: String,
    },
    Processed {
        index: usize,
        filename: String,
        decision: TranscodeDecision,
        relative_path: String,
    },
    Failed {
        index: usize,
        filename: String,
        error: String,
    },
}

/// Per-file result of a batch, in input order.
#[derive(Debug)]
pub struct FileOutcome<T> {
    pub index: usize,
    pub filename: String,
    pub result: Result<T, IngestError>,
}

/// Dependency-injected image ingestion pipeline.
pub struct Pipeline<B: ImageBackend = RustBackend> {
    backend: B,
    config: PipelineConfig,
    keys: KeyGenerator,
}

impl Pipeline<RustBackend> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_backend(RustBackend::new(), config)
    }
}

impl<B: ImageBackend> Pipeline<B> {
    /// Build a pipeline over a specific backend (allows testing with mock).
    pub fn with_backend(backend: B, config: PipelineConfig) -> Self {
        Self {
            backend,
            config,
            keys: KeyGenerator::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Key generator shared with the store for collision retries.
    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the admission check alone.
    pub fn admit(&self, upload: &RawUpload) -> Result<(), AdmissionError> {
        validate(
            upload.declared_size,
            &upload.content_type,
            &self.config.allowed_types,
            self.config.max_file_size,
        )
    }

    /// Admit and decode an upload, then decide its transcode policy.
    ///
    /// Nothing is encoded. Used by `check` and as the first half of
    /// [`process`](Self::process).
    pub fn inspect(
        &self,
        upload: &RawUpload,
    ) -> Result<(DecodedImage, TranscodeDecision), IngestError> {
        if let Err(e) = self.admit(upload) {
            warn!(filename = %upload.filename, error = %e, "upload rejected");
            return Err(e.into());
        }

        let decoded = self.backend.decode(&upload.bytes)?;
        let decision = policy::decide_for(&decoded, &upload.content_type);
        debug!(
            filename = %upload.filename,
            source = %decoded.format,
            declared = %upload.content_type,
            animated = decoded.animated,
            %decision,
            "transcode decision"
        );
        Ok((decoded, decision))
    }

    /// Process one upload into a primary asset, a thumbnail and a storage key.
    pub fn process(&self, upload: &RawUpload) -> Result<ProcessedUpload, IngestError> {
        let (decoded, decision) = self.inspect(upload)?;
        let (width, height) = decoded.dimensions();

        // Primary first: if it fails, no thumbnail work is attempted.
        let primary = transcode_primary(
            &self.backend,
            &decoded,
            &upload.bytes,
            decision,
            &self.config.primary,
        )?;

        let thumbnail = create_thumbnail(
            &self.backend,
            &decoded.image,
            decision.thumbnail_format(),
            &self.config.thumbnail,
        )?;
        let source_format = decoded.format;
        drop(decoded);

        let filename = self.keys.generate(primary.format.extension());
        let key = StorageKey::new(filename, Local::now());

        info!(
            filename = %upload.filename,
            source = %source_format,
            format = %primary.format,
            width,
            height,
            size = primary.bytes.len(),
            key = %key.relative_path(),
            "processed upload"
        );

        Ok(ProcessedUpload {
            original_filename: upload.filename.clone(),
            image: ProcessedImage {
                mime_type: primary.format.mime_type(),
                format: primary.format,
                primary: primary.bytes,
                thumbnail,
                width,
                height,
                source_format,
                decision,
            },
            key,
        })
    }

    /// Reject batches that are empty or over the configured cap.
    pub fn check_batch(&self, len: usize) -> Result<(), BatchError> {
        if len == 0 {
            return Err(BatchError::Empty);
        }
        if len > self.config.max_files {
            return Err(BatchError::TooManyFiles {
                max: self.config.max_files,
                got: len,
            });
        }
        Ok(())
    }

    /// Process a batch in parallel.
    ///
    /// Each file gets its own [`FileOutcome`]; a failure never stops the
    /// others. Outcomes are returned in input order.
    pub fn process_batch(
        &self,
        uploads: &[RawUpload],
        events: Option<Sender<IngestEvent>>,
    ) -> Result<Vec<FileOutcome<ProcessedUpload>>, BatchError> {
        self.process_batch_with(uploads, events, |_, processed| Ok(processed))
    }

    /// Process a batch in parallel and hand every successful result to
    /// `finish` (e.g. a store) on the worker that produced it.
    pub fn process_batch_with<T, F>(
        &self,
        uploads: &[RawUpload],
        events: Option<Sender<IngestEvent>>,
        finish: F,
    ) -> Result<Vec<FileOutcome<T>>, BatchError>
    where
        T: Send,
        F: Fn(&Self, ProcessedUpload) -> Result<T, IngestError> + Sync,
    {
        self.check_batch(uploads.len())?;

        let emit = |event: IngestEvent| {
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
        };

        let outcomes = uploads
            .par_iter()
            .enumerate()
            .map(|(index, upload)| {
                emit(IngestEvent::Started {
                    index,
                    filename: upload.filename.clone(),
                });

                let processed = self.process(upload);
                let result = processed.and_then(|p| {
                    let relative_path = p.key.relative_path();
                    let decision = p.image.decision;
                    finish(self, p).map(|done| (done, decision, relative_path))
                });

                let result = match result {
                    Ok((done, decision, relative_path)) => {
                        emit(IngestEvent::Processed {
                            index,
                            filename: upload.filename.clone(),
                            decision,
                            relative_path,
                        });
                        Ok(done)
                    }
                    Err(e) => {
                        emit(IngestEvent::Failed {
                            index,
                            filename: upload.filename.clone(),
                            error: e.to_string(),
                        });
                        Err(e)
                    }
                };

                FileOutcome {
                    index,
                    filename: upload.filename.clone(),
                    result,
                }
            })
            .collect();

        Ok(outcomes)
    }
}
