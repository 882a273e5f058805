//! Clipboard module
//!
//! Provides clipboard history tracking and monitoring functionality.
//!
//! - `history`: the durable log, slot table and undo buffer
//! - `storage`: redb and in-memory backends behind the `Storage` trait
//! - `monitor`: polling watch loop that reports distinct clipboard changes
//! - `capability`: the clipboard read/write seam
//! - `filter`: secret detection for content that should not be recorded

pub mod capability;
pub mod filter;
pub mod history;
pub mod monitor;
pub mod storage;

pub use capability::{ClipboardCapability, MemoryClipboard};
pub use history::{ClipboardHistory, StoreConfig};
pub use monitor::ClipboardMonitor;
