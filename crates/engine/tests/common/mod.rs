//! Shared helpers for engine integration tests.

use bytes::Bytes;
use futures::Stream;
use futures::stream;
use satchel_core::EngineConfig;
use satchel_engine::{AudioItem, StorageEngine};
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use time::OffsetDateTime;
use time::macros::datetime;

/// Build an engine with default limits rooted at `root`.
#[allow(dead_code)]
pub async fn engine_at(root: &Path) -> StorageEngine {
    StorageEngine::new(EngineConfig::new(root)).await.unwrap()
}

/// The arrival timestamp used by most tests.
#[allow(dead_code)]
pub fn arrival() -> OffsetDateTime {
    datetime!(2025-01-15 14:30:45 UTC)
}

/// A well-formed audio item for sender `chat_id`, item `message_id`.
#[allow(dead_code)]
pub fn ogg_item(chat_id: i64, message_id: i64) -> AudioItem {
    AudioItem {
        chat_id,
        message_id,
        mime_type: "audio/ogg".to_string(),
        extension: "ogg".to_string(),
        declared_size: None,
        duration_secs: Some(3),
        timestamp: arrival(),
    }
}

/// Split `data` into a chunked payload stream.
#[allow(dead_code)]
pub fn chunked(data: &[u8], chunk_size: usize) -> impl Stream<Item = io::Result<Bytes>> + Send + Unpin {
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks)
}

/// A stream that yields `prefix` and then fails like a dropped transport.
#[allow(dead_code)]
pub fn broken_stream(prefix: &[u8]) -> impl Stream<Item = io::Result<Bytes>> + Send + Unpin {
    let mut items: Vec<io::Result<Bytes>> = prefix
        .chunks(4096)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    items.push(Err(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "transport disconnected",
    )));
    stream::iter(items)
}

/// Generate deterministic test data based on a seed.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        // Simple LCG for deterministic data
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    data
}

/// Compute SHA-256 of data as lowercase hex, independently of the engine.
#[allow(dead_code)]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// List the file names under a directory, sorted.
#[allow(dead_code)]
pub async fn file_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names
}
