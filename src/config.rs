//! Ingest configuration module.
//!
//! Handles loading, validating, and merging the `ingest.toml` file. User
//! values are layered over the stock defaults, so a config file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_file_size = 10485760      # Bytes; larger uploads are rejected before decoding
//! allowed_types = ["image/jpeg", "image/png", "image/gif", "image/webp", "image/svg+xml"]
//! max_files = 10                # Files accepted per batch
//!
//! [transcode]
//! quality = 85                  # WebP quality for converted/recompressed primaries (1-100)
//! recompress_threshold = 1048576  # WebP uploads above this many bytes are re-encoded
//!
//! [thumbnail]
//! max_width = 300
//! max_height = 300
//! quality = 80
//!
//! [storage]
//! upload_root = "uploads"       # Files land in {upload_root}/{year}/{month}/
//! url_prefix = "/uploads"       # Public URL prefix written into records
//! max_key_attempts = 5          # Fresh keys tried when a filename is taken
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{PrimaryConfig, Quality, ThumbnailBox, ThumbnailConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Ingest configuration loaded from TOML.
///
/// All fields have defaults taken from the upload service this pipeline
/// serves. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Admission limits (size, allowed types, batch cap).
    pub upload: UploadConfig,
    /// Primary asset encoding.
    pub transcode: TranscodeConfig,
    /// Thumbnail bounding box and quality.
    pub thumbnail: ThumbnailSettings,
    /// Where and how processed files are written.
    pub storage: StorageConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl IngestConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, quality) in [
            ("transcode.quality", self.transcode.quality),
            ("thumbnail.quality", self.thumbnail.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.thumbnail.max_width == 0 || self.thumbnail.max_height == 0 {
            return Err(ConfigError::Validation(
                "thumbnail.max_width and thumbnail.max_height must be non-zero".into(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_size must be non-zero".into(),
            ));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(ConfigError::Validation(
                "upload.allowed_types must not be empty".into(),
            ));
        }
        if self.upload.max_files == 0 {
            return Err(ConfigError::Validation(
                "upload.max_files must be non-zero".into(),
            ));
        }
        if self.storage.max_key_attempts == 0 {
            return Err(ConfigError::Validation(
                "storage.max_key_attempts must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The explicit configuration handed to [`Pipeline`](crate::pipeline::Pipeline).
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            allowed_types: self.upload.allowed_types.clone(),
            max_file_size: self.upload.max_file_size,
            max_files: self.upload.max_files,
            primary: PrimaryConfig {
                quality: Quality::new(self.transcode.quality),
                recompress_threshold: self.transcode.recompress_threshold,
            },
            thumbnail: ThumbnailConfig {
                bounds: ThumbnailBox::new(self.thumbnail.max_width, self.thumbnail.max_height),
                quality: Quality::new(self.thumbnail.quality),
            },
        }
    }
}

/// Everything the pipeline needs, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub allowed_types: Vec<String>,
    pub max_file_size: u64,
    pub max_files: usize,
    pub primary: PrimaryConfig,
    pub thumbnail: ThumbnailConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        IngestConfig::default().pipeline_config()
    }
}

/// Admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted declared size, in bytes.
    pub max_file_size: u64,
    /// Content-types admitted (exact match).
    pub allowed_types: Vec<String>,
    /// Files accepted per batch.
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "image/svg+xml",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_files: 10,
        }
    }
}

/// Primary asset encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeConfig {
    /// WebP quality (1 = worst, 100 = best).
    pub quality: u32,
    /// WebP uploads above this many bytes are re-encoded.
    pub recompress_threshold: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            recompress_threshold: 1024 * 1024,
        }
    }
}

/// Thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 300,
            quality: 80,
        }
    }
}

/// Storage settings for the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub upload_root: PathBuf,
    pub url_prefix: String,
    pub max_key_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("uploads"),
            url_prefix: "/uploads".to_string(),
            max_key_attempts: 5,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(IngestConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse a TOML document and layer it over the stock defaults.
pub fn parse_config(content: &str) -> Result<IngestConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: IngestConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or the stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<IngestConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => {
            let config = IngestConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Returns a fully-commented stock `ingest.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Ingest Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Admission (checked before any decoding)
# ---------------------------------------------------------------------------
[upload]
# Largest accepted upload, in bytes (10 MiB).
max_file_size = 10485760

# Declared content-types that are accepted. Matching is exact.
allowed_types = ["image/jpeg", "image/png", "image/gif", "image/webp", "image/svg+xml"]

# Maximum number of files per batch.
max_files = 10

# ---------------------------------------------------------------------------
# Primary asset
# ---------------------------------------------------------------------------
[transcode]
# WebP quality for converted and recompressed uploads (1 = worst, 100 = best).
quality = 85

# WebP uploads larger than this many bytes are re-encoded; smaller ones are
# stored as uploaded.
recompress_threshold = 1048576

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnail]
# Bounding box; aspect ratio is preserved and small images are never upscaled.
max_width = 300
max_height = 300

# Thumbnail quality (WebP, or JPEG for GIF/SVG uploads).
quality = 80

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Files are written to {upload_root}/{year}/{month}/.
upload_root = "uploads"

# Public URL prefix recorded for stored files.
url_prefix = "/uploads"

# How many fresh filenames to try if a generated one is already taken.
max_key_attempts = 5

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
