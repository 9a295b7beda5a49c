//! Store abstraction over the external key-value service
//!
//! The distributor persists nothing itself; worker lists, the work-unit
//! list, and the matching table all live behind this trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Minimal store surface the control loop needs. No atomicity is assumed
/// across operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Current list at `key`; empty when the key is absent. Order is
    /// returned as stored.
    async fn get_list(&self, key: &str) -> Result<Vec<String>>;

    /// Remove every occurrence of `item` from the list at `key`. A missing
    /// key or item is not an error.
    async fn del_from_list(&self, key: &str, item: &str) -> Result<()>;

    /// Create or overwrite the named fields of the hash at `key`; fields
    /// not named in `entries` are left alone.
    async fn set_map(&self, key: &str, entries: &BTreeMap<String, String>) -> Result<()>;

    /// Remove `field` from the hash at `key`. A missing field is not an
    /// error.
    async fn del_from_map(&self, key: &str, field: &str) -> Result<()>;

    /// Comma-split value at `(key, field)`; empty when absent.
    async fn get_map_field(&self, key: &str, field: &str) -> Result<Vec<String>>;

    /// Release client resources.
    async fn close(&self) -> Result<()>;
}

/// Split a stored comma-joined assignment back into its parts. An empty
/// value (a worker with nothing assigned) splits to an empty list.
pub(crate) fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
