//! Engine error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the storage engine and rate limiter.
///
/// Variants carry identifiers, sizes and durations, never payload content.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported type: {mime} ({extension})")]
    UnsupportedType { mime: String, extension: String },

    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("throttled, retry after {}s", retry_after.as_secs())]
    Throttled { retry_after: Duration },

    #[error("duplicate submission: {stem}")]
    DuplicateSubmission { stem: String },

    #[error("incomplete upload: {0}")]
    Incomplete(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Machine-readable reason code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::TooLarge { .. } => "too_large",
            Self::Throttled { .. } => "throttled",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::Incomplete(_) => "incomplete",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Io(_) => "io_failure",
        }
    }

    /// Whether the caller may retry the same item later.
    ///
    /// Throttled items retry after the window; environment failures retry
    /// after back-off. Validation and idempotency rejections never succeed
    /// on retry.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::StorageUnavailable(_) | Self::Io(_) | Self::Incomplete(_)
        )
    }
}

impl From<satchel_core::Error> for EngineError {
    fn from(err: satchel_core::Error) -> Self {
        match err {
            satchel_core::Error::InvalidInput(msg) => Self::InvalidInput(msg),
            satchel_core::Error::UnsupportedType { mime, extension } => {
                Self::UnsupportedType { mime, extension }
            }
            satchel_core::Error::TooLarge { size, limit } => Self::TooLarge { size, limit },
            satchel_core::Error::InvalidChecksum(msg) | satchel_core::Error::Config(msg) => {
                Self::InvalidInput(msg)
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
