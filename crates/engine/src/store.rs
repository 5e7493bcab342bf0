//! Atomic persistence of payload + metadata pairs.
//!
//! Every item is streamed into a uniquely named temporary file in the final
//! path's directory (same filesystem, so the commit is atomic), with the
//! SHA-256 accumulator fed the exact bytes written. The payload is committed
//! with a no-replace link so a racing duplicate can never clobber committed
//! content; the metadata document is written strictly afterwards through the
//! same temp → sync → rename sequence.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use satchel_core::{Checksum, EngineConfig, ItemKind, TEXT_EXTENSION, naming, validation};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{OffsetDateTime, UtcOffset};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::record::{AudioItem, MetadataDocument, StorageRecord};
use crate::stats::{EngineStats, StatsSnapshot};

/// A boxed stream of payload bytes for streaming ingestion.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// The ingestion & storage engine.
///
/// One instance owns a storage root for the lifetime of the process.
/// Multiple engine instances sharing a root concurrently is unsupported.
#[derive(Debug)]
pub struct StorageEngine {
    config: EngineConfig,
    stats: EngineStats,
    /// Latched when the storage root itself is inaccessible so subsequent
    /// calls fail fast instead of re-probing the root on every item.
    /// Cleared by a successful `health_check`.
    unavailable: AtomicBool,
}

impl StorageEngine {
    /// Create an engine over `config.storage_root`, creating the root if
    /// absent.
    pub async fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.storage_root)
            .await
            .map_err(|e| {
                EngineError::StorageUnavailable(format!(
                    "cannot create storage root {}: {e}",
                    config.storage_root.display()
                ))
            })?;

        Ok(Self {
            config,
            stats: EngineStats::new(),
            unavailable: AtomicBool::new(false),
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Aggregate counters for health-check surfaces.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Persist a text item.
    #[instrument(skip(self, text), fields(size = text.len()))]
    pub async fn save_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        timestamp: OffsetDateTime,
    ) -> EngineResult<StorageRecord> {
        validation::check_size(text.len() as u64, self.config.limits.max_text_bytes)?;

        let payload = Bytes::copy_from_slice(text.as_bytes());
        let stream = futures::stream::iter([Ok::<_, io::Error>(payload)]);
        self.persist(
            ItemKind::Text,
            chat_id,
            message_id,
            timestamp,
            TEXT_EXTENSION,
            None,
            None,
            self.config.limits.max_text_bytes,
            stream,
        )
        .await
    }

    /// Persist an audio item, consuming the payload incrementally.
    ///
    /// The declared size (when the transport advertises one) is checked
    /// before any byte is read; the ceiling is enforced again on the actual
    /// bytes received, aborting mid-stream when exceeded.
    #[instrument(
        skip(self, item, payload),
        fields(
            chat_id = item.chat_id,
            message_id = item.message_id,
            mime = %item.mime_type,
        )
    )]
    pub async fn save_audio<S>(&self, item: AudioItem, payload: S) -> EngineResult<StorageRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Unpin,
    {
        validation::check_audio_type(
            &self.config.allowed_audio_types,
            &item.mime_type,
            &item.extension,
        )?;
        if let Some(declared) = item.declared_size {
            validation::check_size(declared, self.config.limits.max_audio_bytes)?;
        }

        let extension = item.extension.to_ascii_lowercase();
        self.persist(
            ItemKind::Audio,
            item.chat_id,
            item.message_id,
            item.timestamp,
            &extension,
            Some(item.mime_type),
            item.duration_secs,
            self.config.limits.max_audio_bytes,
            payload,
        )
        .await
    }

    /// Probe the storage root and clear the unavailable latch on success.
    pub async fn health_check(&self) -> EngineResult<()> {
        match fs::metadata(&self.config.storage_root).await {
            Ok(meta) if meta.is_dir() => {
                self.unavailable.store(false, Ordering::Relaxed);
                Ok(())
            }
            Ok(_) => Err(self.mark_unavailable(format!(
                "storage root is not a directory: {}",
                self.config.storage_root.display()
            ))),
            Err(e) => Err(self.mark_unavailable(format!(
                "storage root not accessible: {e}"
            ))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist<S>(
        &self,
        kind: ItemKind,
        chat_id: i64,
        message_id: i64,
        timestamp: OffsetDateTime,
        extension: &str,
        mime_type: Option<String>,
        duration_secs: Option<u32>,
        limit: u64,
        mut payload: S,
    ) -> EngineResult<StorageRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Unpin,
    {
        self.ensure_available()?;

        let timestamp = timestamp.to_offset(UtcOffset::UTC);
        let stem = naming::build_stem(timestamp, chat_id, message_id, kind)?;
        let (payload_path, metadata_path) =
            naming::build_paths(&self.config.storage_root, timestamp, &stem, extension)?;

        if let Some(parent) = payload_path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return Err(self.mark_unavailable(format!(
                    "cannot create date partition {}: {e}",
                    parent.display()
                )));
            }
        }

        // Cheap duplicate rejection before any byte is written. The
        // no-replace commit below closes the remaining race window.
        if fs::try_exists(&payload_path).await.map_err(EngineError::Io)? {
            return Err(EngineError::DuplicateSubmission { stem });
        }

        let mut tmp = match TempFile::create(&payload_path).await {
            Ok(tmp) => tmp,
            Err(e) => {
                self.stats.record_error();
                return Err(e.into());
            }
        };
        let mut hasher = Checksum::hasher();
        let mut written: u64 = 0;

        while let Some(chunk) = payload.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tmp.abort().await;
                    tracing::warn!(stem = %stem, bytes = written, error = %e, "payload stream aborted");
                    return Err(EngineError::Incomplete(format!(
                        "payload stream failed after {written} bytes: {e}"
                    )));
                }
            };

            written += chunk.len() as u64;
            if written > limit {
                tmp.abort().await;
                return Err(EngineError::TooLarge {
                    size: written,
                    limit,
                });
            }

            hasher.update(&chunk);
            if let Err(e) = tmp.write(&chunk).await {
                tmp.abort().await;
                self.stats.record_error();
                return Err(e.into());
            }
        }

        if written == 0 {
            tmp.abort().await;
            return Err(EngineError::InvalidInput("zero-byte payload".to_string()));
        }

        // Payload commit point: after this the payload is durable at its
        // final path and the stem is taken for the lifetime of the root.
        match tmp.commit_new(&payload_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(EngineError::DuplicateSubmission { stem });
            }
            Err(e) => {
                self.stats.record_error();
                return Err(e.into());
            }
        }

        let checksum = hasher.finalize();
        let document = MetadataDocument {
            timestamp,
            kind,
            chat_id,
            message_id,
            size: written,
            checksum,
            mime_type: mime_type.clone(),
            duration: duration_secs,
        };

        if let Err(e) = self.write_metadata(&metadata_path, &document).await {
            // The record never became complete; remove the committed payload
            // so readers are not left a permanently metadata-less file.
            let _ = fs::remove_file(&payload_path).await;
            self.stats.record_error();
            return Err(e);
        }

        self.stats.record_stored(written);
        tracing::debug!(stem = %stem, size = written, "item stored");

        Ok(StorageRecord {
            stem,
            payload_path,
            metadata_path,
            size: written,
            checksum,
            mime_type,
            duration_secs,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    async fn write_metadata(
        &self,
        path: &Path,
        document: &MetadataDocument,
    ) -> EngineResult<()> {
        let bytes = serde_json::to_vec_pretty(document).map_err(io::Error::other)?;

        let mut tmp = TempFile::create(path).await?;
        if let Err(e) = tmp.write(&bytes).await {
            tmp.abort().await;
            return Err(e.into());
        }
        tmp.commit_replace(path).await?;
        Ok(())
    }

    fn ensure_available(&self) -> EngineResult<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(EngineError::StorageUnavailable(
                "storage root unavailable; waiting for a successful health check".to_string(),
            ));
        }
        Ok(())
    }

    fn mark_unavailable(&self, reason: String) -> EngineError {
        self.unavailable.store(true, Ordering::Relaxed);
        self.stats.record_error();
        tracing::warn!(reason = %reason, "storage root marked unavailable");
        EngineError::StorageUnavailable(reason)
    }
}

/// A temporary file with guaranteed cleanup.
///
/// The name embeds a UUID so a crash mid-write can never collide with a
/// previously committed file or another in-flight attempt. Every exit path
/// either commits or aborts explicitly; the drop guard is a backstop for
/// panics and early returns, not the primary cleanup mechanism.
struct TempFile {
    file: fs::File,
    guard: TempGuard,
}

struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl TempFile {
    /// Create a temp file in the same directory as `final_path`.
    ///
    /// Same directory means same filesystem, which is what makes the commit
    /// rename/link atomic.
    async fn create(final_path: &Path) -> io::Result<Self> {
        let file_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = final_path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;

        Ok(Self {
            file,
            guard: TempGuard { path, armed: true },
        })
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data).await
    }

    /// Durably commit to `final_path`, refusing to replace an existing file.
    ///
    /// `hard_link` fails with `AlreadyExists` if the destination is present,
    /// so a racing writer for the same stem loses cleanly instead of
    /// overwriting committed content.
    async fn commit_new(mut self, final_path: &Path) -> io::Result<()> {
        self.file.sync_all().await?;
        drop(self.file);
        fs::hard_link(&self.guard.path, final_path).await?;
        let _ = fs::remove_file(&self.guard.path).await;
        self.guard.armed = false;
        Ok(())
    }

    /// Durably commit to `final_path`, replacing any existing file.
    async fn commit_replace(mut self, final_path: &Path) -> io::Result<()> {
        self.file.sync_all().await?;
        drop(self.file);
        fs::rename(&self.guard.path, final_path).await?;
        self.guard.armed = false;
        Ok(())
    }

    async fn abort(mut self) {
        drop(self.file);
        let _ = fs::remove_file(&self.guard.path).await;
        self.guard.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_temp_file_commit_new_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("target.bin");
        tokio::fs::write(&final_path, b"committed").await.unwrap();

        let mut tmp = TempFile::create(&final_path).await.unwrap();
        tmp.write(b"other").await.unwrap();
        let err = tmp.commit_new(&final_path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        // Committed content untouched, temp file cleaned up.
        assert_eq!(tokio::fs::read(&final_path).await.unwrap(), b"committed");
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("target.bin")]);
    }

    #[tokio::test]
    async fn test_temp_file_abort_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("target.bin");

        let mut tmp = TempFile::create(&final_path).await.unwrap();
        tmp.write(b"partial").await.unwrap();
        tmp.abort().await;

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_temp_file_drop_guard_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("target.bin");

        {
            let mut tmp = TempFile::create(&final_path).await.unwrap();
            tmp.write(b"partial").await.unwrap();
            // Dropped without commit or abort.
        }

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_engine_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::new(dir.path());
        config.rate_limit.max_per_window = 0;

        match StorageEngine::new(config).await {
            Err(EngineError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_text_rejects_oversized_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::new(dir.path().join("root"));
        config.limits.max_text_bytes = 4;
        let engine = StorageEngine::new(config).await.unwrap();

        let err = engine
            .save_text(1, 1, "hello", datetime!(2025-01-15 14:30:45 UTC))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TooLarge { size: 5, limit: 4 }));

        // Rejected before any byte touched storage: no date partition.
        let mut entries = fs::read_dir(dir.path().join("root")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
