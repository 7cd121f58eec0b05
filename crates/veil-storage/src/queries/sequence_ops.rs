//! Durable per-(scope, category) counters.

use rusqlite::{params, Connection};

use veil_core::errors::VeilResult;
use veil_core::models::{Category, ScopeId};

use crate::sqlite_err;

/// Increment and return the counter, starting at 1.
pub fn next_sequence(conn: &Connection, scope: &ScopeId, category: &Category) -> VeilResult<u64> {
    let value: i64 = conn
        .query_row(
            "INSERT INTO category_sequences (scope, category, last_value) VALUES (?1, ?2, 1)
             ON CONFLICT(scope, category) DO UPDATE SET last_value = last_value + 1
             RETURNING last_value",
            params![scope.as_str(), category.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| sqlite_err("next_sequence", e))?;
    Ok(value as u64)
}
