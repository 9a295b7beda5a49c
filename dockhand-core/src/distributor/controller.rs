//! The reconciliation control loop
//!
//! One `Distributor` per worker namespace: observes the store, probes worker
//! liveness, keeps the local caches in step, and rewrites the matching table
//! whenever membership changes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::cache::ActiveSet;
use super::rebalancer;
use crate::error::{DistributorError, Result};
use crate::metrics::standard as metrics;
use crate::probe::Prober;
use crate::storage::Store;
use crate::{DEFAULT_PING_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

/// Network pacing for one control loop.
#[derive(Debug, Clone, Copy)]
pub struct Transport {
    /// Per-probe deadline
    pub ping_timeout: Duration,
    /// Interval between reconciliation ticks
    pub poll_interval: Duration,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_millis(DEFAULT_PING_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Store keys scoping one control loop.
///
/// `workers` is private to the namespace; `units` and `table` are shared by
/// every namespace in the process. Worker endpoints and unit names are
/// assumed to live in disjoint string spaces, since both appear as fields of
/// the same table hash.
#[derive(Debug, Clone)]
pub struct NamespaceKeys {
    /// List of worker endpoints for this namespace
    pub workers: String,
    /// List of work units
    pub units: String,
    /// Matching-table hash
    pub table: String,
}

/// Maintains the worker and unit caches, checks worker liveness, and keeps
/// the matching table in the store current.
pub struct Distributor {
    store: Arc<dyn Store>,
    prober: Arc<dyn Prober>,
    keys: NamespaceKeys,
    known_workers: ActiveSet,
    known_units: ActiveSet,
    transport: Transport,
}

impl Distributor {
    /// Build the control loop for one namespace and prime the prober with
    /// the workers currently registered in the store.
    pub async fn new(
        store: Arc<dyn Store>,
        prober: Arc<dyn Prober>,
        keys: NamespaceKeys,
        transport: Transport,
    ) -> Result<Self> {
        if keys.workers.is_empty() {
            return Err(DistributorError::InvalidConfig {
                reason: "worker namespace key is empty".into(),
            });
        }
        if keys.units.is_empty() {
            return Err(DistributorError::InvalidConfig {
                reason: "work-unit list key is empty".into(),
            });
        }
        if keys.table.is_empty() {
            return Err(DistributorError::InvalidConfig {
                reason: "matching-table key is empty".into(),
            });
        }

        let mut transport = transport;
        if transport.ping_timeout.is_zero() {
            transport.ping_timeout = Duration::from_millis(DEFAULT_PING_TIMEOUT_MS);
        }
        if transport.poll_interval.is_zero() {
            transport.poll_interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
        }

        let distributor = Self {
            store,
            prober,
            keys,
            known_workers: ActiveSet::new(),
            known_units: ActiveSet::new(),
            transport,
        };

        let workers = distributor.workers_from_store().await?;
        distributor.prober.init(&workers).await?;

        Ok(distributor)
    }

    /// Worker endpoints currently registered in the store.
    async fn workers_from_store(&self) -> Result<Vec<String>> {
        self.store.get_list(&self.keys.workers).await
    }

    /// Work units currently registered in the store.
    async fn units_from_store(&self) -> Result<Vec<String>> {
        self.store.get_list(&self.keys.units).await
    }

    /// Recompute the matching table from current store state and publish it.
    async fn rebalance(&self) -> Result<()> {
        let units = self.units_from_store().await?;
        if units.is_empty() {
            return Err(DistributorError::NoWorkUnits);
        }
        let workers = self.workers_from_store().await?;
        if workers.is_empty() {
            return Err(DistributorError::NoLiveWorkers);
        }

        let table = rebalancer::compute(&workers, &units)?;
        let entries: BTreeMap<String, String> = table
            .into_iter()
            .map(|(worker, assigned)| (worker, assigned.join(",")))
            .collect();

        debug!(
            namespace = %self.keys.workers,
            "writing matching table with {} entries",
            entries.len()
        );
        self.store.set_map(&self.keys.table, &entries).await?;
        metrics::REBALANCES_TOTAL.inc();
        Ok(())
    }

    /// Rebalance at a trigger point inside a tick. The preconditions (no
    /// units, no workers) downgrade to a warning and leave the table alone;
    /// any other failure aborts the tick. Returns whether the table was
    /// rewritten.
    async fn try_rebalance(&self) -> Result<bool> {
        match self.rebalance().await {
            Ok(()) => Ok(true),
            Err(e) if e.is_precondition() => {
                warn!(namespace = %self.keys.workers, "rebalance skipped: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// One reconciliation pass:
    /// 1. read the worker and unit lists from the store
    /// 2. prune cached workers the store no longer lists
    /// 3. adopt new workers, then probe every listed worker; a failed probe
    ///    evicts the worker from the cache, the store list, and the table
    /// 4. prune cached units the store no longer lists
    /// 5. adopt new units
    ///
    /// Workers are pruned before probing so a tick never removes and
    /// re-adopts the same endpoint; units reconcile last so the final
    /// rebalance sees the committed worker set.
    pub async fn tick(&self) -> Result<()> {
        let workers_from_store = self.workers_from_store().await?;
        let units_from_store = self.units_from_store().await?;

        for worker in self.known_workers.snapshot() {
            if workers_from_store.contains(&worker) {
                continue;
            }
            debug!(namespace = %self.keys.workers, "worker {worker} left the store, pruning");
            self.known_workers.remove(&worker);
            self.store.del_from_map(&self.keys.table, &worker).await?;
            self.try_rebalance().await?;
        }

        for worker in &workers_from_store {
            if !self.known_workers.contains(worker) {
                debug!(namespace = %self.keys.workers, "adopting worker {worker}");
                if self.try_rebalance().await? {
                    self.known_workers.add(worker);
                }
            }

            if let Err(e) = self
                .prober
                .ping(worker, self.transport.ping_timeout)
                .await
            {
                warn!(namespace = %self.keys.workers, "ping {worker} failed: {e}");
                metrics::PROBE_FAILURES_TOTAL.inc();

                self.known_workers.remove(worker);
                self.store.del_from_list(&self.keys.workers, worker).await?;
                self.store.del_from_map(&self.keys.table, worker).await?;
                metrics::WORKERS_EVICTED_TOTAL.inc();
                warn!(namespace = %self.keys.workers, "worker {worker} evicted");

                self.try_rebalance().await?;
            }
        }

        for unit in self.known_units.snapshot() {
            if units_from_store.contains(&unit) {
                continue;
            }
            debug!(namespace = %self.keys.workers, "work unit {unit} left the store, pruning");
            self.known_units.remove(&unit);
            // also clears legacy table entries that were keyed by unit name
            self.store.del_from_map(&self.keys.table, &unit).await?;
            self.try_rebalance().await?;
        }

        for unit in &units_from_store {
            if !self.known_units.contains(unit) {
                debug!(namespace = %self.keys.workers, "adopting work unit {unit}");
                if self.try_rebalance().await? {
                    self.known_units.add(unit);
                }
            }
        }

        metrics::ACTIVE_WORKERS.set(self.known_workers.len() as i64);
        metrics::KNOWN_WORK_UNITS.set(self.known_units.len() as i64);
        Ok(())
    }

    /// Periodic driver. Ticks are serialized: a slow tick delays the next,
    /// never overlaps it. Tick errors go to `errors` so a failing store
    /// cannot stall the loop; the in-flight tick finishes before a shutdown
    /// signal is honored.
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
        errors: mpsc::Sender<DistributorError>,
    ) {
        let mut ticker = interval(self.transport.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(namespace = %self.keys.workers, "control loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    metrics::TICKS_TOTAL.inc();
                    if let Err(e) = self.tick().await {
                        metrics::TICK_ERRORS_TOTAL.inc();
                        if errors.send(e).await.is_err() {
                            warn!(namespace = %self.keys.workers, "error sink closed, dropping tick error");
                        }
                    }
                    metrics::TICK_DURATION.observe(started.elapsed().as_secs_f64());
                }
                _ = shutdown.recv() => {
                    info!(namespace = %self.keys.workers, "control loop stopping");
                    break;
                }
            }
        }
    }
}
