use super::{expiry_millis, now_millis, KvStore};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Volatile [`KvStore`], used by tests and by `--ephemeral` runs.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        let now = now_millis();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    fn put_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(expiry_millis(ttl)),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.entries.lock().unwrap().remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now_millis())))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let entries = self.entries.lock().unwrap();
        let now = now_millis();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap();
        let keys: Vec<String> = entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        Ok(keys.len())
    }
}
