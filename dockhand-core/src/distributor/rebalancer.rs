//! Work-unit assignment
//!
//! Pure consistent-hashing computation of the matching table. Workers are
//! sorted lexicographically before assignment, which makes the output a
//! deterministic function of the input sets.

use std::collections::BTreeMap;

use tracing::debug;

use super::ring::HashRing;
use crate::error::{DistributorError, Result};

/// Virtual-node count for every unit on the ring. The exact value is
/// immaterial as long as it is uniform; 50 keeps rings bit-compatible with
/// earlier deployments.
pub const UNIT_WEIGHT: usize = 50;

/// Compute the matching table for `workers` over `units`.
///
/// Every worker appears in the output, possibly with an empty assignment;
/// no unit appears twice. The last sorted worker absorbs the division
/// remainder when there are more units than workers.
pub fn compute(workers: &[String], units: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    if units.is_empty() {
        return Err(DistributorError::NoWorkUnits);
    }
    if workers.is_empty() {
        return Err(DistributorError::NoLiveWorkers);
    }

    let mut ring = HashRing::with_nodes(units, UNIT_WEIGHT);

    let mut sorted = workers.to_vec();
    sorted.sort_unstable();

    let base_quota = std::cmp::max(1, units.len() / workers.len());
    let remainder = units.len() % workers.len();
    let last = sorted.len() - 1;

    let mut table = BTreeMap::new();
    for (i, worker) in sorted.iter().enumerate() {
        let mut quota = base_quota;
        if i == last && units.len() > workers.len() {
            // leftover units go to the last sorted worker
            quota += remainder;
        }

        let assigned = ring.nodes_for(worker, quota);
        for unit in &assigned {
            // a unit must not end up with two workers
            ring.remove_node(unit);
        }
        table.insert(worker.clone(), assigned);
    }

    debug!(
        "computed matching table: {} workers over {} units",
        sorted.len(),
        units.len()
    );

    Ok(table)
}
