//! Local caches of store-observed workers and work units

use std::collections::HashSet;

use parking_lot::RwLock;

/// Thread-safe membership set used for the known-workers and known-units
/// caches.
///
/// Entries enter only when observed in the store; a successful probe never
/// re-adds one. `snapshot` hands out an unordered copy, so readers never see
/// a partially updated set and the controller stays free of lock discipline.
#[derive(Debug, Default)]
pub struct ActiveSet {
    inner: RwLock<HashSet<String>>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, member: &str) {
        self.inner.write().insert(member.to_string());
    }

    pub fn remove(&self, member: &str) {
        self.inner.write().remove(member);
    }

    pub fn contains(&self, member: &str) -> bool {
        self.inner.read().contains(member)
    }

    /// Copy of the current membership; iteration order is unspecified.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
