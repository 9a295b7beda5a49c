//! Weighted consistent-hash ring over work units
//!
//! Each unit is inserted as a fixed number of virtual nodes; lookups walk
//! the ring clockwise collecting distinct units. The rebalancer depletes
//! the ring as it assigns, so removal drops every replica of a unit.

use std::collections::{hash_map::DefaultHasher, BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Consistent hash ring keyed by worker endpoint, populated by work units.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    /// Ring position -> unit name
    ring: BTreeMap<u64, String>,
    /// Unit name -> its virtual-node positions
    node_hashes: HashMap<String, Vec<u64>>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring with every node inserted at `weight` virtual positions.
    pub fn with_nodes(nodes: &[String], weight: usize) -> Self {
        let mut ring = Self::new();
        for node in nodes {
            ring.add_node(node, weight);
        }
        ring
    }

    /// Insert a node as `weight` virtual positions. Re-inserting an existing
    /// node is a no-op, so duplicate entries in a store list are harmless.
    pub fn add_node(&mut self, node: &str, weight: usize) {
        if self.node_hashes.contains_key(node) {
            return;
        }

        let mut hashes = Vec::with_capacity(weight);
        for replica in 0..weight {
            let hash = Self::hash_of(&format!("{node}:{replica}"));
            self.ring.insert(hash, node.to_string());
            hashes.push(hash);
        }
        self.node_hashes.insert(node.to_string(), hashes);
    }

    /// Remove a node and all of its virtual positions.
    pub fn remove_node(&mut self, node: &str) {
        if let Some(hashes) = self.node_hashes.remove(node) {
            for hash in hashes {
                self.ring.remove(&hash);
            }
        }
    }

    /// Number of distinct nodes on the ring.
    pub fn node_count(&self) -> usize {
        self.node_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_hashes.is_empty()
    }

    /// Up to `want` distinct nodes, walking clockwise from `key`'s position.
    /// Returns fewer when the ring holds fewer distinct nodes.
    pub fn nodes_for(&self, key: &str, want: usize) -> Vec<String> {
        if self.ring.is_empty() || want == 0 {
            return Vec::new();
        }

        let start = Self::hash_of(key);
        let mut picked = Vec::new();
        let mut seen = HashSet::new();

        // range(start..) then range(..start) visits every position once
        for (_, node) in self.ring.range(start..).chain(self.ring.range(..start)) {
            if picked.len() >= want {
                break;
            }
            if seen.insert(node.as_str()) {
                picked.push(node.clone());
            }
        }

        picked
    }

    /// Seed-free position hash; stable for a given `(node, replica)` label.
    fn hash_of(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }
}
