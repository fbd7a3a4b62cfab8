//! Node eligibility and ordering for allocation.
//!
//! Allocation walks nodes in a stable order:
//! - Ordinary nodes keep the order the inventory reported them in
//! - The privileged node goes last so its reserved floor is touched as late as possible
//! - When the privileged node is not allowed it is dropped entirely

use std::collections::BTreeSet;

use cyclegrid_core::NodeCapacity;

/// Filter and order nodes for a single allocation pass.
pub fn eligible_nodes(nodes: &[NodeCapacity], allow_privileged: bool) -> Vec<&NodeCapacity> {
    let mut ordered: Vec<&NodeCapacity> = nodes
        .iter()
        .filter(|n| allow_privileged || !n.privileged)
        .collect();

    // Stable sort keeps inventory order within each group.
    ordered.sort_by_key(|n| n.privileged);
    ordered
}

/// Whether every node id appears once.
pub fn has_unique_ids(nodes: &[NodeCapacity]) -> bool {
    let mut seen = BTreeSet::new();
    nodes.iter().all(|n| seen.insert(n.node_id.as_str()))
}

/// Total free slots across the given nodes.
pub fn total_available(nodes: &[&NodeCapacity]) -> u64 {
    nodes
        .iter()
        .fold(0u64, |acc, n| acc.saturating_add(n.available()))
}
