use super::{expiry_millis, now_millis, KvStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// V 0
const KV_ENTRY_TABLE_V_0: Table = Table {
    name: "kv_entry",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Blob, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_kv_entry_expires_at", "expires_at")],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[KV_ENTRY_TABLE_V_0],
    migration: None,
}];

/// SQLite-backed [`KvStore`].
#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let is_new = !db_path.exists();
        let conn = if is_new {
            Connection::open(db_path)
        } else {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        }
        .with_context(|| format!("Failed to open kv store at {:?}", db_path))?;

        let conn = open_versioned(conn, is_new, VERSIONED_SCHEMAS)?;
        Ok(SqliteKvStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Removes every expired entry. Returns the number of removed rows.
    pub fn prune_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM kv_entry WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_millis()],
        )?;
        if count > 0 {
            debug!("Pruned {} expired kv entries", count);
        }
        Ok(count)
    }

    fn upsert(&self, key: &str, value: &[u8], expires_at: Option<i64>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv_entry (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated = cast(strftime('%s','now') as int)",
            params![key, value, expires_at],
        )
        .with_context(|| format!("Failed to write key {}", key))?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(Vec<u8>, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv_entry WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to read key {}", key))?;

        match row {
            Some((_, Some(expires_at))) if expires_at <= now_millis() => {
                conn.execute("DELETE FROM kv_entry WHERE key = ?1", params![key])?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.upsert(key, value, None)
    }

    fn put_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.upsert(key, value, Some(expiry_millis(ttl)))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM kv_entry WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
            params![key, now_millis()],
        )?;
        // Whatever is left under the key is expired.
        conn.execute("DELETE FROM kv_entry WHERE key = ?1", params![key])?;
        Ok(count > 0)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let conn = self.conn.lock().unwrap();
        let (range_clause, upper) = key_range(prefix);
        let mut stmt = conn.prepare(&format!(
            "SELECT key, value FROM kv_entry
             WHERE {} AND (expires_at IS NULL OR expires_at > ?3)
             ORDER BY key",
            range_clause
        ))?;
        let entries = stmt
            .query_map(params![prefix, upper, now_millis()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to scan prefix {}", prefix))?;
        Ok(entries)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let (range_clause, upper) = key_range(prefix);
        let count = conn.execute(
            &format!("DELETE FROM kv_entry WHERE {}", range_clause),
            params![prefix, upper],
        )?;
        Ok(count)
    }
}

/// Smallest string greater than every string starting with `prefix`, if any.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let mut code = last as u32 + 1;
        // Skip the surrogate range, which has no chars.
        if (0xD800..=0xDFFF).contains(&code) {
            code = 0xE000;
        }
        if let Some(next) = char::from_u32(code) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

/// Key range over the primary key index. Binds `?1` to the prefix and `?2`
/// to its upper bound.
fn key_range(prefix: &str) -> (&'static str, Option<String>) {
    match prefix_upper_bound(prefix) {
        Some(upper) => ("key >= ?1 AND key < ?2", Some(upper)),
        None => ("key >= ?1 AND ?2 IS NULL", None),
    }
}
