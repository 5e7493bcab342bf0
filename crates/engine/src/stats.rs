//! Aggregate engine counters for health-check surfaces.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use time::OffsetDateTime;

/// Process-lifetime counters maintained by the storage engine.
///
/// Counters are monotonic and updated with relaxed atomics; readers get a
/// consistent-enough snapshot for health reporting, not an audit log.
#[derive(Debug, Default)]
pub struct EngineStats {
    items_stored: AtomicU64,
    bytes_stored: AtomicU64,
    /// Unix timestamp of the most recent environment failure, 0 if none.
    last_error_unix: AtomicI64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully committed item.
    pub fn record_stored(&self, bytes: u64) {
        self.items_stored.fetch_add(1, Ordering::Relaxed);
        self.bytes_stored.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record an environment failure (I/O error, unavailable root).
    pub fn record_error(&self) {
        self.last_error_unix
            .store(OffsetDateTime::now_utc().unix_timestamp(), Ordering::Relaxed);
    }

    /// Take a snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let last_error_unix = self.last_error_unix.load(Ordering::Relaxed);
        StatsSnapshot {
            items_stored: self.items_stored.load(Ordering::Relaxed),
            bytes_stored: self.bytes_stored.load(Ordering::Relaxed),
            last_error_at: (last_error_unix != 0)
                .then(|| OffsetDateTime::from_unix_timestamp(last_error_unix).ok())
                .flatten(),
        }
    }
}

/// A point-in-time view of the engine counters.
#[derive(Clone, Debug, Serialize)]
pub struct StatsSnapshot {
    pub items_stored: u64,
    pub bytes_stored: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_error_at: Option<OffsetDateTime>,
}
