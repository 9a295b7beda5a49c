//! End-to-end control-loop tests over the in-memory store
//!
//! Each test seeds the store, runs ticks, and inspects the matching table
//! the way a worker would read it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dockhand_core::distributor::{Distributor, NamespaceKeys, Transport};
use dockhand_core::probe::MockProber;
use dockhand_core::storage::{MemoryStore, Store};

const WORKERS_KEY: &str = "sys-robots-list";
const UNITS_KEY: &str = "sys-channels";
const TABLE_KEY: &str = "sys-matching-table";

async fn distributor_over(store: &Arc<MemoryStore>) -> Distributor {
    let keys = NamespaceKeys {
        workers: WORKERS_KEY.to_string(),
        units: UNITS_KEY.to_string(),
        table: TABLE_KEY.to_string(),
    };
    let transport = Transport {
        ping_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(10),
    };

    Distributor::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(MockProber::new()),
        keys,
        transport,
    )
    .await
    .expect("distributor construction")
}

fn seeded_store(workers: &[&str], units: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_list(WORKERS_KEY, workers);
    store.put_list(UNITS_KEY, units);
    store
}

/// Units across all table values, sorted; panics on a double assignment.
fn all_assigned(table: &BTreeMap<String, String>) -> Vec<String> {
    let mut units: Vec<String> = table
        .values()
        .flat_map(|value| value.split(',').filter(|part| !part.is_empty()))
        .map(str::to_string)
        .collect();
    units.sort();
    for window in units.windows(2) {
        assert_ne!(window[0], window[1], "unit {} assigned twice", window[0]);
    }
    units
}

#[tokio::test]
async fn test_even_distribution_after_first_tick() {
    let store = seeded_store(&["A", "B", "C"], &["u1", "u2", "u3"]);
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();

    let table = store.map(TABLE_KEY);
    assert_eq!(table.len(), 3);
    for (worker, value) in &table {
        assert_eq!(
            value.split(',').count(),
            1,
            "worker {worker} should hold exactly one unit"
        );
    }
    assert_eq!(all_assigned(&table), vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_assignment_stable_across_restart() {
    let store = seeded_store(&["A", "B", "C"], &["u1", "u2", "u3"]);
    distributor_over(&store).await.tick().await.unwrap();

    // a fresh process over identical store contents lands on the same table
    let restarted = seeded_store(&["A", "B", "C"], &["u1", "u2", "u3"]);
    distributor_over(&restarted).await.tick().await.unwrap();

    assert_eq!(store.map(TABLE_KEY), restarted.map(TABLE_KEY));
}

#[tokio::test]
async fn test_consecutive_ticks_are_idempotent() {
    let store = seeded_store(&["A", "B"], &["u1", "u2", "u3", "u4"]);
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();
    let first = store.map(TABLE_KEY);

    distributor.tick().await.unwrap();
    assert_eq!(store.map(TABLE_KEY), first);
}

#[tokio::test]
async fn test_unreachable_workers_evicted() {
    let store = seeded_store(
        &["A", "B", "C", "bad1", "bad2", "bad3"],
        &["u1", "u2", "u3"],
    );
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();

    // the store list shrank to the live workers
    assert_eq!(store.list(WORKERS_KEY), vec!["A", "B", "C"]);

    // the table holds fields for live workers only
    let table = store.map(TABLE_KEY);
    let workers: Vec<&str> = table.keys().map(String::as_str).collect();
    assert_eq!(workers, vec!["A", "B", "C"]);
    assert_eq!(all_assigned(&table), vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_removed_unit_leaves_table() {
    let store = seeded_store(&["A", "B"], &["u1", "u2", "u3", "u4"]);
    let distributor = distributor_over(&store).await;
    distributor.tick().await.unwrap();

    store.put_list(UNITS_KEY, &["u1", "u2", "u4"]);
    distributor.tick().await.unwrap();

    let table = store.map(TABLE_KEY);
    let assigned = all_assigned(&table);
    assert_eq!(assigned, vec!["u1", "u2", "u4"]);
    assert!(!assigned.contains(&"u3".to_string()));
}

#[tokio::test]
async fn test_removed_worker_pruned_from_table() {
    let store = seeded_store(&["A", "B"], &["u1", "u2", "u3"]);
    let distributor = distributor_over(&store).await;
    distributor.tick().await.unwrap();
    assert!(store.map(TABLE_KEY).contains_key("B"));

    store.put_list(WORKERS_KEY, &["A"]);
    distributor.tick().await.unwrap();

    let table = store.map(TABLE_KEY);
    assert!(!table.contains_key("B"));
    assert_eq!(all_assigned(&table), vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_surplus_workers_published_idle() {
    let store = seeded_store(&["A", "B", "C", "D"], &["u1", "u2"]);
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();

    let table = store.map(TABLE_KEY);
    assert_eq!(table.len(), 4, "idle workers still get a table entry");

    let loaded = table.values().filter(|v| !v.is_empty()).count();
    assert_eq!(loaded, 2);
    assert_eq!(all_assigned(&table), vec!["u1", "u2"]);
}

#[tokio::test]
async fn test_table_untouched_without_units() {
    let store = seeded_store(&["A"], &[]);
    let distributor = distributor_over(&store).await;

    // precondition failure is a warning, not a tick error
    distributor.tick().await.unwrap();
    assert!(store.map(TABLE_KEY).is_empty());

    // once units appear the next tick distributes them
    store.put_list(UNITS_KEY, &["u1"]);
    distributor.tick().await.unwrap();
    assert_eq!(store.map(TABLE_KEY).get("A").unwrap(), "u1");
}

#[tokio::test]
async fn test_table_untouched_without_workers() {
    let store = seeded_store(&[], &["u1", "u2"]);
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();
    assert!(store.map(TABLE_KEY).is_empty());

    store.put_list(WORKERS_KEY, &["A"]);
    distributor.tick().await.unwrap();
    assert_eq!(
        all_assigned(&store.map(TABLE_KEY)),
        vec!["u1", "u2"]
    );
}

#[tokio::test]
async fn test_evicted_worker_leaves_nothing_behind() {
    let store = seeded_store(&["bad1"], &["u1", "u2"]);
    let distributor = distributor_over(&store).await;

    distributor.tick().await.unwrap();

    assert!(store.list(WORKERS_KEY).is_empty());
    assert!(store.map(TABLE_KEY).is_empty());
}

#[tokio::test]
async fn test_workers_read_their_slice_back() {
    let store = seeded_store(&["A", "B", "C"], &["u1", "u2", "u3"]);
    let distributor = distributor_over(&store).await;
    distributor.tick().await.unwrap();

    let mut seen = Vec::new();
    for worker in ["A", "B", "C"] {
        let slice = store.get_map_field(TABLE_KEY, worker).await.unwrap();
        assert_eq!(slice.len(), 1);
        seen.extend(slice);
    }
    seen.sort();
    assert_eq!(seen, vec!["u1", "u2", "u3"]);
}
