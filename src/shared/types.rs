use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a history item.
///
/// Ids are handed out in increasing order, so sorting by id yields append
/// order. Positional indices shown to users are resolved to ids internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single clipboard history item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: ItemId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
}

impl HistoryItem {
    /// Create a new unpinned text item
    pub fn new_text(id: ItemId, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            content,
            timestamp,
            pinned: false,
        }
    }

    /// Single-line preview for listings, truncated on a char boundary
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        if flat.chars().count() > max_chars {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            flat
        }
    }
}

/// One record of a JSON export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub pinned: bool,
}

impl From<&HistoryItem> for ExportRecord {
    fn from(item: &HistoryItem) -> Self {
        Self {
            content: item.content.clone(),
            timestamp: item.timestamp,
            pinned: item.pinned,
        }
    }
}
