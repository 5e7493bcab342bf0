//! Storage records and the on-disk metadata document.

use satchel_core::{Checksum, ItemKind};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::UtcOffset;
use time::macros::format_description;

/// Creation timestamps are recorded with microsecond precision.
const ISO_MICROS: &[time::format_description::BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

fn serialize_iso_micros<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = ts
        .to_offset(UtcOffset::UTC)
        .format(ISO_MICROS)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

/// Parameters describing an inbound audio item.
///
/// The payload itself travels separately as a byte stream so large audio is
/// never buffered whole.
#[derive(Clone, Debug)]
pub struct AudioItem {
    /// Sender-channel id the item originated from.
    pub chat_id: i64,
    /// Item id, unique per sender-channel.
    pub message_id: i64,
    /// MIME type declared by the transport.
    pub mime_type: String,
    /// File extension declared by the transport, without the dot.
    pub extension: String,
    /// Size advertised by the transport, if any. Checked up front; actual
    /// bytes are enforced again mid-stream.
    pub declared_size: Option<u64>,
    /// Duration in seconds as reported by the transport, best-effort.
    pub duration_secs: Option<u32>,
    /// UTC arrival timestamp, second precision.
    pub timestamp: OffsetDateTime,
}

/// The durable, write-once unit of persisted state.
///
/// Constructed only after the payload file has been committed to its final
/// path and the metadata document has been written beside it.
#[derive(Clone, Debug, Serialize)]
pub struct StorageRecord {
    /// Deterministic base filename shared by payload and metadata.
    pub stem: String,
    /// Final payload file path.
    pub payload_path: PathBuf,
    /// Final metadata file path.
    pub metadata_path: PathBuf,
    /// Payload size in bytes, counted from the bytes actually written.
    pub size: u64,
    /// SHA-256 of the final on-disk payload bytes.
    pub checksum: Checksum,
    /// MIME type, audio only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Duration in seconds, audio only, omitted if unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// When the record was committed.
    #[serde(serialize_with = "serialize_iso_micros")]
    pub created_at: OffsetDateTime,
}

/// The companion metadata document written beside every payload.
///
/// Field names are part of the on-disk format consumed by the browsing
/// front end; do not rename them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Item arrival timestamp, UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub chat_id: i64,
    pub message_id: i64,
    pub size: u64,
    pub checksum: Checksum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}
