//! Strict error handling with thiserror enums
//!
//! Internals propagate these with `?`. The public store and monitor
//! operations flatten them into success flags and log the cause, so none
//! of these types cross that boundary.

use thiserror::Error;

/// Errors raised by the history store and its storage backends
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system error (data directory, export file)
    #[error("System I/O error: {0}")]
    SystemIO(#[from] std::io::Error),

    /// Embedded database error
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    /// JSON encoding or decoding of a persisted record failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Slot index outside the configured slot range
    #[error("Invalid slot {slot} (valid slots are 0..{count})")]
    InvalidSlot { slot: usize, count: u8 },

    /// Index does not address an item in the current view
    #[error("No history item at index {0}")]
    NotFound(usize),

    /// Undo requested with an empty undo buffer
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Export file could not be committed to its destination
    #[error("Failed to persist export: {0}")]
    Persist(#[from] tempfile::PersistError),
}

// redb splits its errors per operation; funnel them all through redb::Error.
macro_rules! impl_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Database(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type StoreResult<T> = Result<T, StoreError>;

/// Clipboard capability errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The platform clipboard could not be acquired at all
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// The clipboard was acquired but writing failed
    #[error("Clipboard write failed: {0}")]
    Write(String),
}

pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// Settings load/save errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Failed to access settings file: {0}")]
    SystemIO(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_slot_message() {
        let err = StoreError::InvalidSlot { slot: 12, count: 10 };
        assert_eq!(err.to_string(), "Invalid slot 12 (valid slots are 0..10)");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::SystemIO(_)));
    }
}
