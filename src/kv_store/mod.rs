//! Key-value persistence used by the tune store.
//!
//! Every call is its own transaction. Entries written with a TTL behave as
//! absent once expired and are pruned lazily when read.

mod memory_kv_store;
mod sqlite_kv_store;

pub use memory_kv_store::InMemoryKvStore;
pub use sqlite_kv_store::SqliteKvStore;

use anyhow::Result;
use std::time::Duration;

pub trait KvStore: Send + Sync {
    /// Returns the value stored at `key`.
    /// Returns Ok(None) if the key is absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing any previous value and TTL.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Stores `value` at `key`, to be treated as absent after `ttl`.
    fn put_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Deletes `key`. Returns whether a live entry was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Returns all live entries whose key starts with `prefix`, ordered by key.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Deletes every entry whose key starts with `prefix`.
    /// Returns the number of deleted entries.
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Duration) -> i64 {
    now_millis().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64)
}
