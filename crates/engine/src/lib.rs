//! Atomic ingestion and storage engine for Satchel.
//!
//! This crate provides:
//! - `StorageEngine`: durable, collision-free persistence of text and audio
//!   items as payload + metadata pairs under a date-partitioned root, with
//!   temp-write → fsync → no-replace-commit atomicity and incremental
//!   SHA-256 checksums over the exact bytes written
//! - `SenderLimiter`: per-sender admission control with no global lock
//!   across unrelated senders
//! - `EngineStats`: aggregate counters for health-check surfaces
//!
//! The engine assumes a single writer process per storage root; running
//! multiple engine instances against one root concurrently is unsupported.

pub mod error;
pub mod ratelimit;
pub mod record;
pub mod stats;
pub mod store;

pub use error::{EngineError, EngineResult};
pub use ratelimit::{SenderLimiter, spawn_cleanup_task};
pub use record::{AudioItem, MetadataDocument, StorageRecord};
pub use stats::StatsSnapshot;
pub use store::{ByteStream, StorageEngine};
