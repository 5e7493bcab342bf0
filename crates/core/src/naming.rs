//! Deterministic filename stems and date-partitioned paths.
//!
//! A stem is `{YYYYMMDDHHMMSS}-{chat_id}-{message_id}-{kind}`, derived purely
//! from its inputs so the same item always maps to the same path, across
//! processes and restarts. This layer never touches the filesystem.

use crate::item::ItemKind;
use crate::{Error, METADATA_EXTENSION, Result};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Compact UTC timestamp embedded in stems, second precision.
const STEM_TIMESTAMP: &[time::format_description::BorrowedFormatItem<'_>] =
    format_description!("[year][month][day][hour][minute][second]");

/// Build the deterministic filename stem for an item.
///
/// Identical inputs always produce a byte-identical stem. Timestamps outside
/// the formattable year range fail with `InvalidInput`; the timestamp is
/// normalized to UTC before formatting.
pub fn build_stem(
    timestamp: OffsetDateTime,
    chat_id: i64,
    message_id: i64,
    kind: ItemKind,
) -> Result<String> {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    if !(1..=9999).contains(&utc.year()) {
        return Err(Error::InvalidInput(format!(
            "timestamp year {} out of range",
            utc.year()
        )));
    }
    let compact = utc
        .format(STEM_TIMESTAMP)
        .map_err(|e| Error::InvalidInput(format!("unformattable timestamp: {e}")))?;

    let stem = format!("{compact}-{chat_id}-{message_id}-{kind}");
    Ok(sanitize(&stem))
}

/// Build the payload and metadata paths for a stem.
///
/// The date partition `YYYY/MM/DD` is derived from the same timestamp the
/// stem embeds, zero-padded, beneath `base_dir`. Returns the two sibling
/// paths `<stem>.<extension>` and `<stem>.json`.
pub fn build_paths(
    base_dir: &Path,
    timestamp: OffsetDateTime,
    stem: &str,
    extension: &str,
) -> Result<(PathBuf, PathBuf)> {
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidInput(format!(
            "invalid payload extension: {extension:?}"
        )));
    }

    let utc = timestamp.to_offset(UtcOffset::UTC);
    let dir = base_dir
        .join(format!("{:04}", utc.year()))
        .join(format!("{:02}", u8::from(utc.month())))
        .join(format!("{:02}", utc.day()));

    let payload = dir.join(format!("{stem}.{extension}"));
    let metadata = dir.join(format!("{stem}.{METADATA_EXTENSION}"));
    Ok((payload, metadata))
}

/// Strip any character unsafe for a filesystem path component.
///
/// Keeps ASCII alphanumerics, `-` and `_`; drops path separators, control
/// characters, whitespace and everything else. The stem inputs are numeric
/// ids and fixed tags, so in practice this is a no-op.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
