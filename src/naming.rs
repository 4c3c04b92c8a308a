//! Storage key generation.
//!
//! Stored filenames look like `0018a3c2f1e4b7d09c41f2ab.webp`:
//!
//! ```text
//! 0018a3c2f1e4b7d0   9c41f2ab   .webp
//! └─ 16 hex digits   └─ 8 hex   └─ extension of the final format
//!    nanosecond tick    random
//! ```
//!
//! The tick comes from a per-generator monotonic clock: it follows wall-clock
//! nanoseconds but never repeats or goes backwards, so names from one
//! generator are unique and sort by creation time. The random suffix comes
//! from the thread-local CSPRNG and separates names minted by different
//! processes in the same nanosecond.
//!
//! Keys are placed under a `{year}/{month}` directory (local time).

use chrono::{DateTime, Local};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Mints collision-resistant, time-sortable filenames.
///
/// Safe to share across threads; one instance is injected into the pipeline
/// and the store.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last_tick: AtomicU64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next strictly increasing nanosecond tick.
    fn next_tick(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut prev = self.last_tick.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev.wrapping_add(1));
            match self.last_tick.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Generate a bare filename with the given extension.
    ///
    /// The extension may be passed with or without its leading dot. Anything
    /// that is not ASCII alphanumeric is dropped from it, so the result never
    /// contains a path separator.
    pub fn generate(&self, extension: &str) -> String {
        let tick = self.next_tick();
        let salt: u32 = rand::rng().random();
        let ext: String = extension
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();

        if ext.is_empty() {
            format!("{tick:016x}{salt:08x}")
        } else {
            format!("{tick:016x}{salt:08x}.{ext}")
        }
    }
}

/// Where a processed upload is stored, relative to the upload root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    /// Bare filename, e.g. `0018a3c2f1e4b7d09c41f2ab.webp`.
    pub filename: String,
    /// Date partition, e.g. `2026/03`.
    pub directory: String,
    pub created_at: DateTime<Local>,
}

impl StorageKey {
    pub fn new(filename: String, created_at: DateTime<Local>) -> Self {
        Self {
            directory: created_at.format("%Y/%m").to_string(),
            filename,
            created_at,
        }
    }

    /// `{year}/{month}/{filename}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.directory, self.filename)
    }

    /// Filename without its extension.
    pub fn stem(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.filename)
    }

    /// Same partition and timestamp, different filename.
    pub fn with_filename(&self, filename: String) -> Self {
        Self {
            filename,
            directory: self.directory.clone(),
            created_at: self.created_at,
        }
    }
}
