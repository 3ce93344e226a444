//! Artifact storage service
//!
//! Persists uploaded originals and removal results under an injected storage
//! root. Every save creates a new, uniquely named file; nothing is ever
//! overwritten.

use crate::{
    error::{BgEraserError, Result},
    services::format::MediaFormatHandler,
    types::{ArtifactRecord, Bucket},
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Append-only blob store rooted at a directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. No I/O happens until the first save.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a bucket
    #[must_use]
    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    /// On-disk path of a stored artifact
    #[must_use]
    pub fn path_for(&self, record: &ArtifactRecord) -> PathBuf {
        self.bucket_dir(record.bucket).join(&record.file_name)
    }

    /// Create both bucket directories if missing
    ///
    /// # Errors
    /// - `StorageWriteFailed` when a directory cannot be created
    pub async fn ensure_buckets(&self) -> Result<()> {
        for bucket in Bucket::all() {
            let dir = self.bucket_dir(bucket);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| BgEraserError::file_io_error("create bucket directory", &dir, &e))?;
        }
        Ok(())
    }

    /// Persist `bytes` as a new artifact in `bucket`
    ///
    /// # Errors
    /// - `StorageWriteFailed` when the directory or file cannot be written.
    ///   Failures are surfaced as-is and never retried. A partially written
    ///   file is removed before returning.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        bytes: &[u8],
        suggested_extension: &str,
        bucket: Bucket,
    ) -> Result<ArtifactRecord> {
        let dir = self.bucket_dir(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BgEraserError::file_io_error("create bucket directory", &dir, &e))?;

        let extension = Self::sanitize_extension(suggested_extension);
        let file_name = format!("{}{}.{}", Uuid::new_v4(), bucket.name_suffix(), extension);
        let path = dir.join(&file_name);

        // create_new refuses to touch an existing file
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| BgEraserError::file_io_error("create artifact", &path, &e))?;

        Self::write_or_discard(file, bytes, &path).await?;

        let record = ArtifactRecord {
            locator: format!("/{}/{}", bucket.dir_name(), file_name),
            mime_type: MediaFormatHandler::mime_for_extension(&extension).to_string(),
            size_bytes: bytes.len() as u64,
            bucket,
            file_name,
            created_at: Utc::now(),
        };

        debug!(locator = %record.locator, "Artifact stored");
        Ok(record)
    }

    /// Write `bytes` through `writer`, removing `path` if the write fails
    ///
    /// Removal is best effort; the write error is what the caller sees.
    async fn write_or_discard<W>(mut writer: W, bytes: &[u8], path: &Path) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let written = match writer.write_all(bytes).await {
            Ok(()) => writer
                .flush()
                .await
                .map_err(|e| BgEraserError::file_io_error("flush artifact", path, &e)),
            Err(e) => Err(BgEraserError::file_io_error("write artifact", path, &e)),
        };
        drop(writer);

        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove partial artifact");
            }
        }
        written
    }

    /// Lowercase alphanumeric extension, `bin` when nothing usable remains
    fn sanitize_extension(extension: &str) -> String {
        let cleaned: String = extension
            .trim_start_matches('.')
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(8)
            .collect::<String>()
            .to_ascii_lowercase();
        if cleaned.is_empty() {
            "bin".to_string()
        } else {
            cleaned
        }
    }
}
