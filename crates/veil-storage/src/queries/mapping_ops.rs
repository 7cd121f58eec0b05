//! Find, save, conditional insert, scope delete and purge for mappings.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL orders them correctly.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use veil_core::errors::VeilResult;
use veil_core::models::{Category, InsertOutcome, ScopeId, StoredMapping};

use crate::{sqlite_err, to_storage_err};

const COLUMNS: &str =
    "scope, category, lookup_key, substitute_value, sealed_original, encrypted, created_at, expires_at";

pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> VeilResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("bad timestamp '{raw}': {e}")))
}

/// Raw column values, converted after the row borrow ends.
struct MappingRow {
    scope: String,
    category: String,
    lookup_key: String,
    substitute_value: String,
    sealed_original: String,
    encrypted: bool,
    created_at: String,
    expires_at: Option<String>,
}

impl MappingRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            scope: row.get(0)?,
            category: row.get(1)?,
            lookup_key: row.get(2)?,
            substitute_value: row.get(3)?,
            sealed_original: row.get(4)?,
            encrypted: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            expires_at: row.get(7)?,
        })
    }

    fn into_mapping(self) -> VeilResult<StoredMapping> {
        Ok(StoredMapping {
            scope: ScopeId::new(self.scope),
            category: Category::new(self.category),
            lookup_key: self.lookup_key,
            substitute_value: self.substitute_value,
            sealed_original: self.sealed_original,
            encrypted: self.encrypted,
            created_at: parse_ts(&self.created_at)?,
            expires_at: self.expires_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

/// Live record for (scope, category, lookup key).
pub fn find(
    conn: &Connection,
    scope: &ScopeId,
    category: &Category,
    lookup_key: &str,
    now: DateTime<Utc>,
) -> VeilResult<Option<StoredMapping>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM mappings
                 WHERE scope = ?1 AND category = ?2 AND lookup_key = ?3
                   AND (expires_at IS NULL OR expires_at > ?4)"
            ),
            params![scope.as_str(), category.as_str(), lookup_key, fmt_ts(now)],
            MappingRow::from_row,
        )
        .optional()
        .map_err(|e| sqlite_err("find", e))?;
    row.map(MappingRow::into_mapping).transpose()
}

/// Live record owning `substitute` in `scope`. Served by the unique substitute index.
pub fn find_by_token(
    conn: &Connection,
    scope: &ScopeId,
    substitute: &str,
    now: DateTime<Utc>,
) -> VeilResult<Option<StoredMapping>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM mappings
                 WHERE scope = ?1 AND substitute_value = ?2
                   AND (expires_at IS NULL OR expires_at > ?3)"
            ),
            params![scope.as_str(), substitute, fmt_ts(now)],
            MappingRow::from_row,
        )
        .optional()
        .map_err(|e| sqlite_err("find_by_token", e))?;
    row.map(MappingRow::into_mapping).transpose()
}

/// Expired rows never block a new write for the same key or substitute.
fn clear_expired_blockers(conn: &Connection, record: &StoredMapping, now: &str) -> VeilResult<()> {
    conn.execute(
        "DELETE FROM mappings
         WHERE scope = ?1
           AND ((category = ?2 AND lookup_key = ?3) OR substitute_value = ?4)
           AND expires_at IS NOT NULL AND expires_at <= ?5",
        params![
            record.scope.as_str(),
            record.category.as_str(),
            record.lookup_key,
            record.substitute_value,
            now
        ],
    )
    .map_err(|e| sqlite_err("clear_expired", e))?;
    Ok(())
}

fn insert_row(conn: &Connection, record: &StoredMapping, upsert: bool) -> VeilResult<usize> {
    let conflict = if upsert {
        "ON CONFLICT(scope, category, lookup_key) DO UPDATE SET
             substitute_value = excluded.substitute_value,
             sealed_original = excluded.sealed_original,
             encrypted = excluded.encrypted,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at"
    } else {
        "ON CONFLICT(scope, category, lookup_key) DO NOTHING"
    };
    conn.execute(
        &format!("INSERT INTO mappings ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) {conflict}"),
        params![
            record.scope.as_str(),
            record.category.as_str(),
            record.lookup_key,
            record.substitute_value,
            record.sealed_original,
            record.encrypted as i64,
            fmt_ts(record.created_at),
            record.expires_at.map(fmt_ts),
        ],
    )
    .map_err(|e| sqlite_err("insert_mapping", e))
}

/// Run `f` inside an IMMEDIATE transaction so concurrent processes serialize.
fn in_write_tx<T>(conn: &Connection, op: &str, f: impl FnOnce(&Connection) -> VeilResult<T>) -> VeilResult<T> {
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| sqlite_err(&format!("{op} begin"), e))?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()
                .map_err(|e| sqlite_err(&format!("{op} commit"), e))?;
            Ok(value)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Upsert. Last write wins for the key; a substitute owned by another key is a conflict.
pub fn save(conn: &Connection, record: &StoredMapping, now: DateTime<Utc>) -> VeilResult<()> {
    let now = fmt_ts(now);
    in_write_tx(conn, "save", |tx| {
        clear_expired_blockers(tx, record, &now)?;
        insert_row(tx, record, true)?;
        Ok(())
    })
}

/// Insert only if no live record exists for the key.
pub fn insert_new(
    conn: &Connection,
    record: &StoredMapping,
    now: DateTime<Utc>,
) -> VeilResult<InsertOutcome> {
    let now_str = fmt_ts(now);
    in_write_tx(conn, "insert_new", |tx| {
        clear_expired_blockers(tx, record, &now_str)?;
        if insert_row(tx, record, false)? == 1 {
            return Ok(InsertOutcome::Inserted);
        }
        match find(tx, &record.scope, &record.category, &record.lookup_key, now)? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(to_storage_err("insert_new: row vanished inside transaction")),
        }
    })
}

/// Delete every mapping and counter of `scope`.
pub fn delete_scope(conn: &Connection, scope: &ScopeId) -> VeilResult<usize> {
    in_write_tx(conn, "delete_scope", |tx| {
        let removed = tx
            .execute("DELETE FROM mappings WHERE scope = ?1", params![scope.as_str()])
            .map_err(|e| sqlite_err("delete_scope", e))?;
        tx.execute(
            "DELETE FROM category_sequences WHERE scope = ?1",
            params![scope.as_str()],
        )
        .map_err(|e| sqlite_err("delete_scope sequences", e))?;
        Ok(removed)
    })
}

pub fn count(conn: &Connection, scope: &ScopeId, now: DateTime<Utc>) -> VeilResult<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM mappings
             WHERE scope = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
            params![scope.as_str(), fmt_ts(now)],
            |row| row.get(0),
        )
        .map_err(|e| sqlite_err("count", e))?;
    Ok(n as usize)
}

pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> VeilResult<usize> {
    conn.execute(
        "DELETE FROM mappings WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        params![fmt_ts(now)],
    )
    .map_err(|e| sqlite_err("purge_expired", e))
}
