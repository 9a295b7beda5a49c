//! Probe double for tests

use std::time::Duration;

use async_trait::async_trait;

use super::Prober;
use crate::error::{DistributorError, Result};

/// Prober that fails any endpoint whose name contains `bad`.
#[derive(Debug, Default)]
pub struct MockProber;

impl MockProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn init(&self, _endpoints: &[String]) -> Result<()> {
        Ok(())
    }

    async fn ping(&self, endpoint: &str, _timeout: Duration) -> Result<()> {
        if endpoint.contains("bad") {
            return Err(DistributorError::ProbeFailed {
                endpoint: endpoint.to_string(),
                reason: "bad request".into(),
            });
        }
        Ok(())
    }
}
