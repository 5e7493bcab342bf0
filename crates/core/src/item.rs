//! Item kinds accepted by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an inbound item.
///
/// The kind tag is embedded in the filename stem and recorded in the
/// metadata document, so its string form is part of the on-disk format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Audio,
}

impl ItemKind {
    /// Stable string tag used in stems and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
