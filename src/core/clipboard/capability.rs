//! Clipboard capability seam
//!
//! The core only talks to the clipboard through [`ClipboardCapability`].
//! The platform implementation lives in `system::clipboard`.

use std::sync::{Arc, Mutex};

use crate::shared::errors::ClipboardResult;

/// Read/write access to a text clipboard.
///
/// `read_text` returns `Ok(None)` when the clipboard holds no text (empty,
/// or a non-text format). Change notification is done by polling in
/// [`super::ClipboardMonitor`].
pub trait ClipboardCapability: Send + Sync {
    fn read_text(&self) -> ClipboardResult<Option<String>>;
    fn write_text(&self, text: &str) -> ClipboardResult<()>;
}

/// Process-local clipboard
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    content: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            content: Arc::new(Mutex::new(Some(text.into()))),
        }
    }

    /// Drop the current content, as if another app copied a non-text format
    pub fn clear(&self) {
        let mut content = match self.content.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *content = None;
    }
}

impl ClipboardCapability for MemoryClipboard {
    fn read_text(&self) -> ClipboardResult<Option<String>> {
        let content = match self.content.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(content.clone().filter(|text| !text.is_empty()))
    }

    fn write_text(&self, text: &str) -> ClipboardResult<()> {
        let mut content = match self.content.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *content = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_roundtrip() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().unwrap(), None);

        clipboard.write_text("hello").unwrap();
        assert_eq!(clipboard.read_text().unwrap().as_deref(), Some("hello"));

        clipboard.clear();
        assert_eq!(clipboard.read_text().unwrap(), None);
    }

    #[test]
    fn test_empty_text_reads_as_none() {
        let clipboard = MemoryClipboard::with_text("");
        assert_eq!(clipboard.read_text().unwrap(), None);
    }

    #[test]
    fn test_clones_share_content() {
        let clipboard = MemoryClipboard::new();
        let other = clipboard.clone();
        other.write_text("shared").unwrap();
        assert_eq!(clipboard.read_text().unwrap().as_deref(), Some("shared"));
    }
}
