//! Worker liveness probing
//!
//! The controller treats a probe as a single pass/fail verdict; everything
//! else (pooling, retries, keep-alive) is the prober's business.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub mod http;
pub mod mock;

pub use http::{HttpProber, ProbeConfig};
pub use mock::MockProber;

/// Liveness checker for worker endpoints.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Prepare clients for the given endpoints. Partial success is fine:
    /// the first error is reported, but endpoints that connected stay
    /// usable for later pings.
    async fn init(&self, endpoints: &[String]) -> Result<()>;

    /// One liveness round-trip to `endpoint`, bounded by `timeout`.
    /// Failures never remove the pooled connection; eviction is the
    /// controller's decision.
    async fn ping(&self, endpoint: &str, timeout: Duration) -> Result<()>;
}
