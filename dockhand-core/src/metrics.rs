//! Prometheus metrics for monitoring
//!
//! Text-format counters, gauges, and a latency histogram; the daemon serves
//! the rendered output on its `/metrics` route.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counter metric (monotonically increasing)
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
            help,
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name,
            self.help,
            self.name,
            self.name,
            self.get()
        )
    }
}

/// Gauge metric (can go up or down)
pub struct Gauge {
    value: AtomicI64,
    name: &'static str,
    help: &'static str,
}

impl Gauge {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicI64::new(0),
            name,
            help,
        }
    }

    pub fn set(&self, val: i64) {
        self.value.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
            self.name,
            self.help,
            self.name,
            self.name,
            self.get()
        )
    }
}

/// Histogram for latency measurements
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    sum_micros: AtomicU64,
    count: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Histogram {
    /// Create with buckets suited to sub-second control-loop latencies
    pub fn new(name: &'static str, help: &'static str) -> Self {
        let bounds = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
        Self {
            buckets: bounds.iter().map(|&b| (b, AtomicU64::new(0))).collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Observe a value in seconds
    pub fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value * 1_000_000.0) as u64, Ordering::Relaxed);

        for (bound, count) in &self.buckets {
            if value <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        let mut output = format!(
            "# HELP {} {}\n# TYPE {} histogram\n",
            self.name, self.help, self.name
        );

        for (bound, count) in &self.buckets {
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                self.name,
                bound,
                count.load(Ordering::Relaxed)
            ));
        }

        let sum_secs = self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        output.push_str(&format!("{}_sum {}\n", self.name, sum_secs));
        output.push_str(&format!(
            "{}_count {}\n",
            self.name,
            self.count.load(Ordering::Relaxed)
        ));

        output
    }
}

/// Standard distributor metrics
pub mod standard {
    use std::sync::LazyLock;

    use super::*;

    pub static TICKS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "distributor_ticks_total",
            "Total reconciliation ticks executed",
        )
    });

    pub static TICK_ERRORS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "distributor_tick_errors_total",
            "Total ticks that ended with an error",
        )
    });

    pub static REBALANCES_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "distributor_rebalances_total",
            "Total matching-table rewrites",
        )
    });

    pub static WORKERS_EVICTED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "distributor_workers_evicted_total",
            "Total workers evicted after a failed probe",
        )
    });

    pub static PROBE_FAILURES_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "distributor_probe_failures_total",
            "Total liveness probes that failed",
        )
    });

    pub static ACTIVE_WORKERS: LazyLock<Gauge> = LazyLock::new(|| {
        Gauge::new(
            "distributor_active_workers",
            "Workers currently in the local cache",
        )
    });

    pub static KNOWN_WORK_UNITS: LazyLock<Gauge> = LazyLock::new(|| {
        Gauge::new(
            "distributor_known_work_units",
            "Work units currently in the local cache",
        )
    });

    pub static TICK_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
        Histogram::new(
            "distributor_tick_duration_seconds",
            "Reconciliation tick latency",
        )
    });
}

/// Render every standard metric for the /metrics endpoint
pub fn gather_system_metrics() -> String {
    let mut output = String::new();

    output.push_str(&standard::TICKS_TOTAL.to_prometheus());
    output.push_str(&standard::TICK_ERRORS_TOTAL.to_prometheus());
    output.push_str(&standard::REBALANCES_TOTAL.to_prometheus());
    output.push_str(&standard::WORKERS_EVICTED_TOTAL.to_prometheus());
    output.push_str(&standard::PROBE_FAILURES_TOTAL.to_prometheus());

    output.push_str(&standard::ACTIVE_WORKERS.to_prometheus());
    output.push_str(&standard::KNOWN_WORK_UNITS.to_prometheus());

    output.push_str(&standard::TICK_DURATION.to_prometheus());

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("test_counter", "Test counter");
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
        assert!(counter.to_prometheus().contains("test_counter 2"));
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new("test_gauge", "Test gauge");
        gauge.set(7);
        assert_eq!(gauge.get(), 7);
        gauge.set(-1);
        assert_eq!(gauge.get(), -1);
    }

    #[test]
    fn test_histogram() {
        let histogram = Histogram::new("test_histogram", "Test histogram");

        histogram.observe(0.001);
        histogram.observe(0.01);
        histogram.observe(0.1);

        let prometheus = histogram.to_prometheus();
        assert!(prometheus.contains("test_histogram_count 3"));
    }

    #[test]
    fn test_gather_includes_standard_metrics() {
        let output = gather_system_metrics();
        assert!(output.contains("distributor_ticks_total"));
        assert!(output.contains("distributor_active_workers"));
        assert!(output.contains("distributor_tick_duration_seconds"));
    }
}
