//! Engine configuration types.
//!
//! These are plain serde types with field defaults and a `validate()` pass;
//! loading them from a file or the environment belongs to the front-end
//! binaries, not this library.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An allowed (MIME, extension) pair for audio payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedAudioType {
    /// MIME type as declared by the transport (e.g. "audio/ogg").
    pub mime: String,
    /// File extension without the dot (e.g. "ogg").
    pub extension: String,
}

impl AllowedAudioType {
    fn new(mime: &str, extension: &str) -> Self {
        Self {
            mime: mime.to_string(),
            extension: extension.to_string(),
        }
    }
}

/// Size ceilings per item kind, in bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Maximum text payload size (default: 64 KiB).
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,
    /// Maximum audio payload size (default: 50 MiB).
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: default_max_text_bytes(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

/// Per-sender admission control configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Events admitted per sender per window (default: 10).
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    /// Window length in seconds (default: 60).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Interval between idle-sender eviction passes in seconds (default: 300).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory for the date-partitioned archive.
    pub storage_root: PathBuf,
    /// Size ceilings.
    #[serde(default)]
    pub limits: SizeLimits,
    /// Admission control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Accepted audio (MIME, extension) pairs.
    #[serde(default = "EngineConfig::default_audio_types")]
    pub allowed_audio_types: Vec<AllowedAudioType>,
    /// Optional static allow-list of sender-channel ids. `None` admits
    /// every sender.
    #[serde(default)]
    pub allowlist: Option<Vec<i64>>,
}

impl EngineConfig {
    /// Create a configuration with defaults rooted at `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            limits: SizeLimits::default(),
            rate_limit: RateLimitConfig::default(),
            allowed_audio_types: Self::default_audio_types(),
            allowlist: None,
        }
    }

    /// The default audio allow-list: the voice container the transport
    /// normally delivers plus a small set of common audio containers.
    pub fn default_audio_types() -> Vec<AllowedAudioType> {
        vec![
            AllowedAudioType::new("audio/ogg", "ogg"),
            AllowedAudioType::new("audio/mpeg", "mp3"),
            AllowedAudioType::new("audio/mp4", "m4a"),
            AllowedAudioType::new("audio/wav", "wav"),
        ]
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(crate::Error::Config("storage_root must be set".into()));
        }
        if self.limits.max_text_bytes == 0 || self.limits.max_audio_bytes == 0 {
            return Err(crate::Error::Config("size limits must be non-zero".into()));
        }
        if self.rate_limit.max_per_window == 0 {
            return Err(crate::Error::Config(
                "rate_limit.max_per_window must be at least 1".into(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(crate::Error::Config(
                "rate_limit.window_secs must be at least 1".into(),
            ));
        }
        if self.allowed_audio_types.is_empty() {
            return Err(crate::Error::Config(
                "allowed_audio_types must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check whether a sender-channel id passes the static allow-list.
    pub fn is_sender_allowed(&self, chat_id: i64) -> bool {
        match &self.allowlist {
            None => true,
            Some(ids) => ids.contains(&chat_id),
        }
    }

    /// A loggable summary that never includes payload-bearing values.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "storage_root": self.storage_root.display().to_string(),
            "max_text_bytes": self.limits.max_text_bytes,
            "max_audio_bytes": self.limits.max_audio_bytes,
            "rate_limit_per_window": self.rate_limit.max_per_window,
            "rate_limit_window_secs": self.rate_limit.window_secs,
            "allowed_audio_types": self.allowed_audio_types.len(),
            "allowlist_count": self.allowlist.as_ref().map(Vec::len),
        })
    }
}

fn default_max_text_bytes() -> u64 {
    64 * 1024
}

fn default_max_audio_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_max_per_window() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    300
}
