//! Core domain types and pure logic for the Satchel ingestion engine.
//!
//! This crate defines the canonical data model used by the engine crate:
//! - Item kinds (text, audio)
//! - Integrity checksums
//! - Deterministic filename stems and date-partitioned paths
//! - Content-type and size validation
//! - Engine configuration
//!
//! Nothing in this crate touches the filesystem or the clock; every function
//! here is deterministic given its inputs.

pub mod config;
pub mod error;
pub mod hash;
pub mod item;
pub mod naming;
pub mod validation;

pub use config::{AllowedAudioType, EngineConfig, RateLimitConfig, SizeLimits};
pub use error::{Error, Result};
pub use hash::{Checksum, ChecksumHasher};
pub use item::ItemKind;
pub use naming::{build_paths, build_stem};

/// Extension used for text payload files.
pub const TEXT_EXTENSION: &str = "txt";

/// Extension used for metadata documents.
pub const METADATA_EXTENSION: &str = "json";
