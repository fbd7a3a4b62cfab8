//! Allocation engine — spreads one cycle's units across nodes.
//!
//! Given the four unit requirements of a cycle and a node snapshot, the
//! engine decides:
//! 1. Whether the eligible nodes can hold the whole cycle (all or nothing)
//! 2. Which nodes receive each operation group, in `ALLOCATION_ORDER`
//! 3. How much capacity is left on every eligible node afterwards
//!
//! Requirements are consumed greedily in the stable node order from
//! [`eligible_nodes`], splitting across nodes when one is not enough.
//! Replenish prefers a single node and only splits when no node can
//! take it whole.

use std::collections::BTreeMap;

use cyclegrid_core::{BatchStage, NodeCapacity, UnitRequirements};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::order::{eligible_nodes, has_unique_ids, total_available};

/// Order in which requirements draw on capacity.
///
/// Stabilize groups anchor the completion sequence, so they are placed
/// first; under scarcity replenish is the group that starves.
pub const ALLOCATION_ORDER: [BatchStage; 4] = [
    BatchStage::StabilizeFirst,
    BatchStage::StabilizeSecond,
    BatchStage::Drain,
    BatchStage::Replenish,
];

/// Units of one operation group assigned to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub node_id: String,
    pub units: u64,
}

/// Placement decision for a whole cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub drain: Vec<Placement>,
    pub stabilize_first: Vec<Placement>,
    pub replenish: Vec<Placement>,
    pub stabilize_second: Vec<Placement>,
    /// Node-id → free slots left after this allocation.
    pub remaining: BTreeMap<String, u64>,
}

impl Allocation {
    pub fn placements(&self, stage: BatchStage) -> &[Placement] {
        match stage {
            BatchStage::Drain => &self.drain,
            BatchStage::StabilizeFirst => &self.stabilize_first,
            BatchStage::Replenish => &self.replenish,
            BatchStage::StabilizeSecond => &self.stabilize_second,
        }
    }

    fn placements_mut(&mut self, stage: BatchStage) -> &mut Vec<Placement> {
        match stage {
            BatchStage::Drain => &mut self.drain,
            BatchStage::StabilizeFirst => &mut self.stabilize_first,
            BatchStage::Replenish => &mut self.replenish,
            BatchStage::StabilizeSecond => &mut self.stabilize_second,
        }
    }

    /// Units placed for one stage across all nodes.
    pub fn placed_units(&self, stage: BatchStage) -> u64 {
        self.placements(stage).iter().map(|p| p.units).sum()
    }

    /// Units committed on one node across all four stages.
    pub fn committed_on(&self, node_id: &str) -> u64 {
        BatchStage::FINISH_ORDER
            .iter()
            .flat_map(|stage| self.placements(*stage))
            .filter(|p| p.node_id == node_id)
            .map(|p| p.units)
            .sum()
    }

    pub fn total_units(&self) -> u64 {
        BatchStage::FINISH_ORDER
            .iter()
            .map(|stage| self.placed_units(*stage))
            .sum()
    }
}

/// Compute an allocation for one cycle.
///
/// Fails without placing anything when the eligible nodes cannot hold
/// the sum of all four requirements. Node ids must be unique: placements
/// and `remaining` are keyed by id.
pub fn distribute(
    req: &UnitRequirements,
    nodes: &[NodeCapacity],
    allow_privileged: bool,
) -> PlacementResult<Allocation> {
    debug_assert!(has_unique_ids(nodes), "duplicate node id in inventory");
    let eligible = eligible_nodes(nodes, allow_privileged);
    let available = total_available(&eligible);
    let required = req.total();

    if required > available {
        warn!(
            required,
            available,
            nodes = eligible.len(),
            "cannot place cycle — insufficient capacity"
        );
        return Err(PlacementError::InsufficientCapacity {
            required,
            available,
        });
    }

    let mut free: Vec<(String, u64)> = eligible
        .iter()
        .map(|n| (n.node_id.clone(), n.available()))
        .collect();

    let mut allocation = Allocation::default();
    for stage in ALLOCATION_ORDER {
        let units = req.get(stage);
        let placements = if stage == BatchStage::Replenish {
            place_whole(&mut free, units).unwrap_or_else(|| place_split(&mut free, units))
        } else {
            place_split(&mut free, units)
        };

        for p in &placements {
            debug!(stage = %stage, node = %p.node_id, units = p.units, "placed units");
        }
        *allocation.placements_mut(stage) = placements;
    }

    allocation.remaining = free.into_iter().collect();
    Ok(allocation)
}

/// Rebuild a node list so each node's free slots match `remaining`.
///
/// Lets a caller chain a second `distribute` on top of a first one
/// without re-querying the inventory. Nodes absent from the map are
/// returned unchanged.
pub fn apply_remaining(
    nodes: &[NodeCapacity],
    remaining: &BTreeMap<String, u64>,
) -> Vec<NodeCapacity> {
    nodes
        .iter()
        .map(|n| {
            let mut node = n.clone();
            if let Some(&left) = remaining.get(&n.node_id) {
                let usable = n.total.saturating_sub(n.reserved);
                node.committed = usable.saturating_sub(left);
            }
            node
        })
        .collect()
}

/// Greedily consume capacity in node order, splitting as needed.
fn place_split(free: &mut [(String, u64)], units: u64) -> Vec<Placement> {
    let mut remaining = units;
    let mut placements = Vec::new();

    for (node_id, left) in free.iter_mut() {
        if remaining == 0 {
            break;
        }
        if *left == 0 {
            continue;
        }
        let take = remaining.min(*left);
        *left -= take;
        remaining -= take;
        placements.push(Placement {
            node_id: node_id.clone(),
            units: take,
        });
    }

    debug_assert_eq!(remaining, 0, "capacity pre-check guarantees a full split");
    placements
}

/// Place all units on the first node that can take them whole.
fn place_whole(free: &mut [(String, u64)], units: u64) -> Option<Vec<Placement>> {
    if units == 0 {
        return Some(Vec::new());
    }
    let (node_id, left) = free.iter_mut().find(|(_, left)| *left >= units)?;
    *left -= units;
    Some(vec![Placement {
        node_id: node_id.clone(),
        units,
    }])
}
