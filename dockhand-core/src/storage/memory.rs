//! In-memory store for tests and local runs
//!
//! Mirrors the Redis list/hash layout so control-loop behavior can be
//! exercised without a server.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{split_csv, Store};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    lists: HashMap<String, Vec<String>>,
    maps: HashMap<String, BTreeMap<String, String>>,
}

/// Hash-map backed store double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace the list at `key`.
    pub fn put_list(&self, key: &str, items: &[&str]) {
        self.inner.lock().lists.insert(
            key.to_string(),
            items.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Copy of the list at `key`; empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.inner.lock().lists.get(key).cloned().unwrap_or_default()
    }

    /// Copy of the hash at `key`; empty when absent.
    pub fn map(&self, key: &str) -> BTreeMap<String, String> {
        self.inner.lock().maps.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.list(key))
    }

    async fn del_from_list(&self, key: &str, item: &str) -> Result<()> {
        if let Some(list) = self.inner.lock().lists.get_mut(key) {
            list.retain(|entry| entry != item);
        }
        Ok(())
    }

    async fn set_map(&self, key: &str, entries: &BTreeMap<String, String>) -> Result<()> {
        let mut inner = self.inner.lock();
        let map = inner.maps.entry(key.to_string()).or_default();
        for (field, value) in entries {
            map.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn del_from_map(&self, key: &str, field: &str) -> Result<()> {
        if let Some(map) = self.inner.lock().maps.get_mut(key) {
            map.remove(field);
        }
        Ok(())
    }

    async fn get_map_field(&self, key: &str, field: &str) -> Result<Vec<String>> {
        let value = self
            .inner
            .lock()
            .maps
            .get(key)
            .and_then(|map| map.get(field))
            .cloned();
        Ok(value.map(|v| split_csv(&v)).unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_keys_are_empty() {
        let store = MemoryStore::new();
        assert!(store.get_list("nope").await.unwrap().is_empty());
        assert!(store.get_map_field("nope", "w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_del_from_list_removes_all_occurrences() {
        let store = MemoryStore::new();
        store.put_list("workers", &["w1", "w2", "w1"]);

        store.del_from_list("workers", "w1").await.unwrap();
        assert_eq!(store.list("workers"), vec!["w2".to_string()]);

        // removing again is not an error
        store.del_from_list("workers", "w1").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_map_preserves_unnamed_fields() {
        let store = MemoryStore::new();

        let mut first = BTreeMap::new();
        first.insert("w1".to_string(), "u1,u2".to_string());
        first.insert("w2".to_string(), "u3".to_string());
        store.set_map("table", &first).await.unwrap();

        let mut second = BTreeMap::new();
        second.insert("w2".to_string(), "u1,u3".to_string());
        store.set_map("table", &second).await.unwrap();

        assert_eq!(
            store.get_map_field("table", "w1").await.unwrap(),
            vec!["u1".to_string(), "u2".to_string()]
        );
        assert_eq!(
            store.get_map_field("table", "w2").await.unwrap(),
            vec!["u1".to_string(), "u3".to_string()]
        );
    }
}
