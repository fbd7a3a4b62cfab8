//! Conversions from memory-sized hosts to unit-slot capacities.
//!
//! Inventories usually report hosts in memory, while the allocation
//! engine counts whole units of work. A unit costs a fixed amount of
//! memory, so slots are derived by division, rounding against the node.

use cyclegrid_core::NodeCapacity;

use crate::error::{PlacementError, PlacementResult};

/// Memory figures for a single host as an inventory reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMemory {
    pub id: String,
    pub max_memory: f64,
    pub used_memory: f64,
    /// Memory that must stay free (home node only).
    pub reserved_memory: f64,
    pub privileged: bool,
}

/// Convert a memory-sized host into a [`NodeCapacity`].
///
/// Total slots round down, reserved and used slots round up, so the
/// resulting `available()` never promises more than the host has.
pub fn node_from_memory(host: &HostMemory, unit_cost: f64) -> PlacementResult<NodeCapacity> {
    if !(unit_cost > 0.0) || !unit_cost.is_finite() {
        return Err(PlacementError::InvalidUnitCost(unit_cost.to_string()));
    }

    let total = slots_floor(host.max_memory, unit_cost);
    let reserved = slots_ceil(host.reserved_memory, unit_cost).min(total);
    let committed = slots_ceil(host.used_memory, unit_cost);

    Ok(NodeCapacity {
        node_id: host.id.clone(),
        total,
        reserved,
        committed,
        privileged: host.privileged,
    })
}

/// Convert a whole inventory, preserving order.
pub fn nodes_from_memory(
    hosts: &[HostMemory],
    unit_cost: f64,
) -> PlacementResult<Vec<NodeCapacity>> {
    hosts.iter().map(|h| node_from_memory(h, unit_cost)).collect()
}

fn slots_floor(memory: f64, unit_cost: f64) -> u64 {
    if memory <= 0.0 {
        return 0;
    }
    (memory / unit_cost).floor() as u64
}

fn slots_ceil(memory: f64, unit_cost: f64) -> u64 {
    if memory <= 0.0 {
        return 0;
    }
    (memory / unit_cost).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(id: &str, max: f64, used: f64) -> HostMemory {
        HostMemory {
            id: id.to_string(),
            max_memory: max,
            used_memory: used,
            reserved_memory: 0.0,
            privileged: false,
        }
    }

    #[test]
    fn converts_plain_host() {
        let node = node_from_memory(&host("n00dles", 16.0, 0.0), 1.75).unwrap();

        assert_eq!(node.node_id, "n00dles");
        assert_eq!(node.total, 9); // 16 / 1.75 = 9.14
        assert_eq!(node.reserved, 0);
        assert_eq!(node.available(), 9);
        assert!(!node.privileged);
    }

    #[test]
    fn used_memory_rounds_against_node() {
        let node = node_from_memory(&host("n1", 16.0, 2.0), 1.75).unwrap();
        assert_eq!(node.committed, 2);
        assert_eq!(node.available(), 7);
    }

    #[test]
    fn home_reservation_becomes_slots() {
        let home = HostMemory {
            id: "home".to_string(),
            max_memory: 128.0,
            used_memory: 0.0,
            reserved_memory: 64.0,
            privileged: true,
        };
        let node = node_from_memory(&home, 2.0).unwrap();

        assert_eq!(node.total, 64);
        assert_eq!(node.reserved, 32);
        assert_eq!(node.available(), 32);
        assert!(node.privileged);
    }

    #[test]
    fn reservation_larger_than_host_leaves_nothing() {
        let home = HostMemory {
            id: "home".to_string(),
            max_memory: 32.0,
            used_memory: 0.0,
            reserved_memory: 64.0,
            privileged: true,
        };
        let node = node_from_memory(&home, 2.0).unwrap();
        assert_eq!(node.reserved, node.total);
        assert_eq!(node.available(), 0);
    }

    #[test]
    fn rejects_non_positive_unit_cost() {
        assert!(node_from_memory(&host("n1", 16.0, 0.0), 0.0).is_err());
        assert!(node_from_memory(&host("n1", 16.0, 0.0), -1.0).is_err());
        assert!(node_from_memory(&host("n1", 16.0, 0.0), f64::NAN).is_err());
    }

    #[test]
    fn converted_nodes_work_with_distribute() {
        use crate::distribute::distribute;
        use cyclegrid_core::UnitRequirements;

        let hosts = vec![host("a", 8.0, 0.0), host("b", 4.0, 1.0)];
        let nodes = nodes_from_memory(&hosts, 1.0).unwrap();

        let alloc = distribute(&UnitRequirements::new(3, 3, 3, 2), &nodes, false).unwrap();
        assert_eq!(alloc.total_units(), 11);
        assert!(distribute(&UnitRequirements::new(3, 3, 3, 3), &nodes, false).is_err());
    }
}
