//! Dockhand - work-to-worker distribution daemon
//!
//! This crate provides the control loop that keeps a fleet of stateless
//! workers matched to a set of work units:
//! - Store observation and liveness probing
//! - Consistent-hashing rebalancing
//! - Matching-table publication

pub mod config;
pub mod distributor;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod runtime;
pub mod storage;

pub use distributor::{Distributor, NamespaceKeys, Transport};
pub use error::DistributorError;

/// Default time to wait for a worker liveness response, in milliseconds
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 800;

/// Default interval between reconciliation ticks, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
