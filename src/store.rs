//! Local filesystem store for processed uploads.
//!
//! Layout under the upload root:
//!
//! ```text
//! uploads/
//! └── 2026/
//!     └── 03/
//!         ├── 0018a3c2f1e4b7d09c41f2ab.webp      # primary
//!         └── thumbs/
//!             └── 0018a3c2f1e4b7d09c41f2ab.webp  # thumbnail
//! ```
//!
//! Every file is written to a temp file in its destination directory, synced,
//! then linked into place with `persist_noclobber`. A name that is already
//! taken is never overwritten. When either the primary or the thumbnail name
//! is taken, the store asks the [`KeyGenerator`] for a fresh name and tries
//! the pair again, up to `max_key_attempts` times. If the thumbnail cannot be
//! written the primary is removed again, so a failed upload leaves no files
//! behind.

use crate::config::StorageConfig;
use crate::naming::{KeyGenerator, StorageKey};
use crate::types::ProcessedUpload;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

pub const THUMBNAIL_DIR: &str = "thumbs";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free filename after {attempts} attempts")]
    Collision { attempts: u32 },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What gets recorded about a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub url: String,
    pub filename: String,
    pub original_filename: String,
    /// Size of the stored primary, in bytes.
    pub file_size: u64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub thumbnail_url: String,
    /// SHA-256 of the stored primary, hex encoded.
    pub sha256: String,
    pub created_at: String,
}

/// Writes processed uploads beneath a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    url_prefix: String,
    max_key_attempts: u32,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>, max_key_attempts: u32) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_key_attempts: max_key_attempts.max(1),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.upload_root.clone(),
            config.url_prefix.clone(),
            config.max_key_attempts,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a path relative to the root.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }

    /// Store the primary and thumbnail of a processed upload.
    ///
    /// The upload's own key is tried first. The primary and its thumbnail
    /// are claimed as a pair: if either name is already taken, whatever was
    /// written for this attempt is removed and `keys` supplies a fresh
    /// filename in the same partition.
    pub fn persist(
        &self,
        upload: &ProcessedUpload,
        keys: &KeyGenerator,
    ) -> Result<ImageRecord, StoreError> {
        let dir = self.root.join(&upload.key.directory);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let extension = upload
            .key
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("");

        let mut key = upload.key.clone();
        for attempt in 1..=self.max_key_attempts {
            match self.write_pair(&dir, &key, upload)? {
                Some(thumb_name) => {
                    return Ok(self.record(upload, &key, &thumb_name));
                }
                None => {
                    warn!(
                        filename = %key.filename,
                        attempt,
                        "filename taken, generating a new one"
                    );
                    key = upload.key.with_filename(keys.generate(extension));
                }
            }
        }
        Err(StoreError::Collision {
            attempts: self.max_key_attempts,
        })
    }

    /// Write the primary, then the thumbnail, under `key`.
    ///
    /// Returns the thumbnail filename, or `None` when either name is taken.
    /// Nothing written by this call survives a `None` or an error.
    fn write_pair(
        &self,
        dir: &Path,
        key: &StorageKey,
        upload: &ProcessedUpload,
    ) -> Result<Option<String>, StoreError> {
        let image = &upload.image;
        let primary_path = dir.join(&key.filename);
        match write_new(dir, &primary_path, &image.primary) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(StoreError::io(&primary_path, e)),
        }

        let thumb_dir = dir.join(THUMBNAIL_DIR);
        let thumb_name = format!("{}.{}", key.stem(), image.thumbnail.format.extension());
        let thumb_path = thumb_dir.join(&thumb_name);
        let written = fs::create_dir_all(&thumb_dir)
            .and_then(|()| write_new(&thumb_dir, &thumb_path, &image.thumbnail.bytes));

        match written {
            Ok(()) => {
                debug!(
                    primary = %primary_path.display(),
                    thumbnail = %thumb_path.display(),
                    "stored upload"
                );
                Ok(Some(thumb_name))
            }
            Err(e) => {
                remove_primary(&primary_path);
                if e.kind() == io::ErrorKind::AlreadyExists && thumb_dir.is_dir() {
                    Ok(None)
                } else {
                    warn!(path = %thumb_path.display(), error = %e, "thumbnail write failed");
                    Err(StoreError::io(&thumb_path, e))
                }
            }
        }
    }

    fn record(&self, upload: &ProcessedUpload, key: &StorageKey, thumb_name: &str) -> ImageRecord {
        let image = &upload.image;
        ImageRecord {
            url: self.url_for(&key.relative_path()),
            filename: key.filename.clone(),
            original_filename: upload.original_filename.clone(),
            file_size: image.primary.len() as u64,
            mime_type: image.mime_type.to_string(),
            width: image.width,
            height: image.height,
            thumbnail_url: self.url_for(&format!(
                "{}/{}/{}",
                key.directory, THUMBNAIL_DIR, thumb_name
            )),
            sha256: format!("{:x}", Sha256::digest(&image.primary)),
            created_at: key.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn remove_primary(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove primary");
    }
}

/// Write `bytes` to `path` without ever replacing an existing file.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when `path` is taken.
fn write_new(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}
