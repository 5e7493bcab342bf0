//! Content-type and size validation.
//!
//! Both checks are side-effect-free and run before any byte is written to
//! storage, so rejected items never touch the filesystem. Text items skip
//! the type check entirely.

use crate::config::AllowedAudioType;
use crate::{Error, Result};

/// Check a declared (MIME, extension) pair against the configured allow-list.
///
/// Matching is case-insensitive on both fields. The pair must match a single
/// allow-list entry; a known MIME with a mismatched extension is rejected.
pub fn check_audio_type(
    allowed: &[AllowedAudioType],
    mime: &str,
    extension: &str,
) -> Result<()> {
    let matches = allowed.iter().any(|entry| {
        entry.mime.eq_ignore_ascii_case(mime) && entry.extension.eq_ignore_ascii_case(extension)
    });
    if matches {
        Ok(())
    } else {
        Err(Error::UnsupportedType {
            mime: mime.to_string(),
            extension: extension.to_string(),
        })
    }
}

/// Check a byte count against a configured ceiling.
///
/// Zero-byte payloads are rejected as invalid input; sizes exactly at the
/// limit are accepted.
pub fn check_size(size: u64, limit: u64) -> Result<()> {
    if size == 0 {
        return Err(Error::InvalidInput("zero-byte payload".to_string()));
    }
    if size > limit {
        return Err(Error::TooLarge { size, limit });
    }
    Ok(())
}
