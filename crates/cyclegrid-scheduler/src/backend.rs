//! Collaborator seams.
//!
//! The scheduler never talks to a real cluster directly. Node discovery,
//! target queries, cost formulas and the launch primitive are supplied
//! through these traits; `cyclegrid-sim` provides an in-process backend.

use std::time::Duration;

use cyclegrid_core::{NodeCapacity, OperationKind, TargetState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reads the current state of a target.
pub trait TargetProbe {
    /// `None` when the target does not exist.
    fn state(&self, target: &str) -> Option<TargetState>;
}

/// Enumerates worker nodes and their current capacity.
pub trait NodeInventory {
    /// Ordered snapshot. Only authoritative for a single allocation.
    /// Node ids must be unique within one snapshot.
    fn nodes(&self) -> Vec<NodeCapacity>;
}

/// Pure unit-cost formulas.
pub trait CostModel {
    /// Drain units needed to remove `amount` of resource (fractional).
    fn drain_units(&self, target: &TargetState, amount: f64) -> f64;

    /// Penalty added by `units` of drain.
    fn drain_penalty(&self, units: u64) -> f64;

    /// Replenish units needed to multiply the resource by `multiplier` (fractional).
    fn replenish_units(&self, target: &TargetState, multiplier: f64) -> f64;

    /// Penalty added by `units` of replenish.
    fn replenish_penalty(&self, units: u64) -> f64;

    /// Stabilize units needed to remove `penalty` from the target.
    fn stabilize_units(&self, penalty: f64) -> u64;
}

/// A single unit-of-work group to start on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub kind: OperationKind,
    pub node_id: String,
    pub units: u64,
    pub target: String,
    /// Delay between dispatch and the work actually starting.
    pub delay: Duration,
}

/// Opaque identifier of launched work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("{kind} launch on {node_id} rejected: {reason}")]
    Rejected {
        kind: OperationKind,
        node_id: String,
        reason: String,
    },
}

/// Starts work on a node.
pub trait Launcher {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchHandle, LaunchError>;
}

/// Everything the orchestrator needs from the outside world.
pub trait Backend: TargetProbe + NodeInventory + CostModel + Launcher {}

impl<T> Backend for T where T: TargetProbe + NodeInventory + CostModel + Launcher {}
