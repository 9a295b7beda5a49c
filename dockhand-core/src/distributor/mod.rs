//! Control loop, caches, and assignment computation

pub mod cache;
pub mod controller;
pub mod rebalancer;
pub mod ring;

pub use cache::ActiveSet;
pub use controller::{Distributor, NamespaceKeys, Transport};
pub use ring::HashRing;
