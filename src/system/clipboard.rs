use cli_clipboard::{ClipboardContext, ClipboardProvider};
use tracing::trace;

use crate::core::clipboard::ClipboardCapability;
use crate::shared::errors::{ClipboardError, ClipboardResult};

/// Platform clipboard through `cli-clipboard`.
///
/// A fresh context is opened per call so the type stays `Send + Sync`
/// and a clipboard owner that goes away between polls is tolerated.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn context() -> ClipboardResult<ClipboardContext> {
        ClipboardContext::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

impl ClipboardCapability for SystemClipboard {
    fn read_text(&self) -> ClipboardResult<Option<String>> {
        let mut ctx = Self::context()?;
        match ctx.get_contents() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                // Non-text content and an empty selection both surface as errors here.
                trace!("clipboard holds no text: {}", e);
                Ok(None)
            }
        }
    }

    fn write_text(&self, text: &str) -> ClipboardResult<()> {
        let mut ctx = Self::context()?;
        ctx.set_contents(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}
