pub mod types;
pub mod settings;
pub mod errors;

// Re-export the error types for convenience
pub use errors::{ClipboardError, SettingsError, StoreError};
