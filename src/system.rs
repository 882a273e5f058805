//! Platform glue kept out of the core
pub mod clipboard;

pub use clipboard::SystemClipboard;
