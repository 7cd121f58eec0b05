//! # veil-storage
//!
//! Durable Store backends, the source of truth for mappings.
//!
//! - [`MemoryDurableStore`]: process-local maps, for tests and one-shot runs.
//! - [`SqliteDurableStore`]: a SQLite-backed document collection with one
//!   namespace per mapping scope, a unique substitute index for backward
//!   lookups, WAL mode and a read connection pool.

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod sqlite;

pub use memory::MemoryDurableStore;
pub use sqlite::SqliteDurableStore;

use rusqlite::ErrorCode;
use veil_core::errors::{StorageError, VeilError};

/// Wrap a driver message as a storage error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> VeilError {
    StorageError::SqliteError {
        message: message.into(),
    }
    .into()
}

/// Map a rusqlite error, surfacing constraint violations as conflicts.
pub(crate) fn sqlite_err(context: &str, e: rusqlite::Error) -> VeilError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        match failure.code {
            ErrorCode::ConstraintViolation => {
                return StorageError::Conflict {
                    details: format!("{context}: {e}"),
                }
                .into();
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return StorageError::Unavailable {
                    reason: format!("{context}: {e}"),
                }
                .into();
            }
            _ => {}
        }
    }
    to_storage_err(format!("{context}: {e}"))
}
