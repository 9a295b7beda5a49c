//! HTTP liveness prober
//!
//! Keeps one pooled client per worker endpoint and answers pings with a
//! bounded GET against the worker's `/livez` route.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::Prober;
use crate::error::{DistributorError, Result};

/// Attempts inside a single ping call. Transient connection flaps must not
/// churn the assignment, so one verdict covers several tries.
const PING_RETRIES: u32 = 15;

/// Fixed backoff between ping attempts.
const PING_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Transport keep-alive settings for probe connections.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// HTTP/2 keep-alive ping interval
    pub keepalive_interval: Duration,
    /// Time to wait for a keep-alive ping acknowledgement
    pub keepalive_timeout: Duration,
    /// Send keep-alive pings on idle connections too
    pub keepalive_while_idle: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(20),
            keepalive_while_idle: false,
        }
    }
}

/// Connection-pooled HTTP prober.
///
/// Lookups share the read lock; only a first ping to an unknown endpoint
/// takes the write lock to insert its client. Clients are never removed
/// here, only at process shutdown.
pub struct HttpProber {
    pool: RwLock<HashMap<String, Client>>,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            pool: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn build_client(&self, endpoint: &str) -> Result<Client> {
        Client::builder()
            .http2_keep_alive_interval(self.config.keepalive_interval)
            .http2_keep_alive_timeout(self.config.keepalive_timeout)
            .http2_keep_alive_while_idle(self.config.keepalive_while_idle)
            .build()
            .map_err(|e| DistributorError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    /// Pooled client for `endpoint`, created lazily on first use.
    fn client_for(&self, endpoint: &str) -> Result<Client> {
        if let Some(client) = self.pool.read().get(endpoint) {
            return Ok(client.clone());
        }

        let client = self.build_client(endpoint)?;
        let mut pool = self.pool.write();
        Ok(pool
            .entry(endpoint.to_string())
            .or_insert(client)
            .clone())
    }

    async fn ping_once(client: &Client, url: &str) -> bool {
        match client.get(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Probe URL for a worker endpoint. Bare `host:port` endpoints get the
/// plain-HTTP scheme; full URLs are used as-is.
fn probe_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        format!("{}/livez", endpoint.trim_end_matches('/'))
    } else {
        format!("http://{endpoint}/livez")
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn init(&self, endpoints: &[String]) -> Result<()> {
        let mut first_err = None;

        for endpoint in endpoints {
            if self.pool.read().contains_key(endpoint) {
                continue;
            }
            if let Err(e) = self.client_for(endpoint) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn ping(&self, endpoint: &str, deadline: Duration) -> Result<()> {
        let client = self.client_for(endpoint)?;
        let url = probe_url(endpoint);

        let attempts = async {
            for attempt in 0..=PING_RETRIES {
                if Self::ping_once(&client, &url).await {
                    return true;
                }
                debug!("probe attempt {attempt} to {endpoint} failed");
                sleep(PING_RETRY_BACKOFF).await;
            }
            false
        };

        match timeout(deadline, attempts).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DistributorError::ProbeFailed {
                endpoint: endpoint.to_string(),
                reason: "no successful response".into(),
            }),
            Err(_) => Err(DistributorError::ProbeFailed {
                endpoint: endpoint.to_string(),
                reason: format!("deadline of {deadline:?} exceeded"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url_from_bare_endpoint() {
        assert_eq!(probe_url("10.0.0.1:8080"), "http://10.0.0.1:8080/livez");
    }

    #[test]
    fn test_probe_url_keeps_scheme() {
        assert_eq!(
            probe_url("https://worker-1.internal:8443/"),
            "https://worker-1.internal:8443/livez"
        );
    }

    #[tokio::test]
    async fn test_ping_unreachable_endpoint_times_out() {
        let prober = HttpProber::new(ProbeConfig::default());
        let err = prober
            .ping("127.0.0.1:1", Duration::from_millis(150))
            .await
            .unwrap_err();
        assert!(matches!(err, DistributorError::ProbeFailed { .. }));
    }

    #[tokio::test]
    async fn test_failed_ping_keeps_connection_pooled() {
        let prober = HttpProber::new(ProbeConfig::default());
        let _ = prober.ping("127.0.0.1:1", Duration::from_millis(100)).await;
        assert!(prober.pool.read().contains_key("127.0.0.1:1"));
    }
}
