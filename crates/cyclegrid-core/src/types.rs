//! Shared types used across cyclegrid crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing penalty/resource levels against baseline.
pub const BASELINE_EPSILON: f64 = 1e-9;

/// Kind of work that can be launched against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Extracts resource from the target.
    Drain,
    /// Lowers the target's penalty level.
    Stabilize,
    /// Restores the target's resource level.
    Replenish,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Drain => "drain",
            OperationKind::Stabilize => "stabilize",
            OperationKind::Replenish => "replenish",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the four operation groups launched per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Drain,
    StabilizeFirst,
    Replenish,
    StabilizeSecond,
}

impl BatchStage {
    /// All stages in the order their completions land.
    pub const FINISH_ORDER: [BatchStage; 4] = [
        BatchStage::Drain,
        BatchStage::StabilizeFirst,
        BatchStage::Replenish,
        BatchStage::StabilizeSecond,
    ];

    pub fn kind(&self) -> OperationKind {
        match self {
            BatchStage::Drain => OperationKind::Drain,
            BatchStage::StabilizeFirst | BatchStage::StabilizeSecond => OperationKind::Stabilize,
            BatchStage::Replenish => OperationKind::Replenish,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatchStage::Drain => "drain",
            BatchStage::StabilizeFirst => "stabilize-1",
            BatchStage::Replenish => "replenish",
            BatchStage::StabilizeSecond => "stabilize-2",
        }
    }
}

impl std::fmt::Display for BatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Target ─────────────────────────────────────────────────────────

/// Point-in-time view of a target.
///
/// Every field may change between queries, so a snapshot is only valid
/// for the cycle that fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub id: String,
    pub penalty: f64,
    pub min_penalty: f64,
    pub resource: f64,
    pub max_resource: f64,
    /// Base duration of a drain operation at the current penalty.
    pub drain_time: Duration,
    /// Base duration of a replenish operation at the current penalty.
    pub replenish_time: Duration,
    /// Base duration of a stabilize operation at the current penalty.
    pub stabilize_time: Duration,
}

impl TargetState {
    pub fn penalty_excess(&self) -> f64 {
        (self.penalty - self.min_penalty).max(0.0)
    }

    pub fn at_min_penalty(&self) -> bool {
        (self.penalty - self.min_penalty).abs() <= BASELINE_EPSILON
    }

    pub fn at_max_resource(&self) -> bool {
        (self.max_resource - self.resource).abs() <= BASELINE_EPSILON
    }

    /// Minimum penalty and maximum resource: the state every cycle starts from.
    pub fn is_at_baseline(&self) -> bool {
        self.at_min_penalty() && self.at_max_resource()
    }
}

// ── Nodes ──────────────────────────────────────────────────────────

/// Capacity snapshot of a single worker node, in unit slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCapacity {
    pub node_id: String,
    pub total: u64,
    /// Floor that must stay free. Non-zero only on the privileged node.
    #[serde(default)]
    pub reserved: u64,
    /// Slots already taken by running work.
    #[serde(default)]
    pub committed: u64,
    #[serde(default)]
    pub privileged: bool,
}

impl NodeCapacity {
    pub fn new(node_id: impl Into<String>, total: u64) -> Self {
        Self {
            node_id: node_id.into(),
            total,
            reserved: 0,
            committed: 0,
            privileged: false,
        }
    }

    /// A privileged node keeping `reserved` slots untouched.
    pub fn privileged(node_id: impl Into<String>, total: u64, reserved: u64) -> Self {
        Self {
            node_id: node_id.into(),
            total,
            reserved,
            committed: 0,
            privileged: true,
        }
    }

    pub fn with_committed(mut self, committed: u64) -> Self {
        self.committed = committed;
        self
    }

    pub fn available(&self) -> u64 {
        self.total
            .saturating_sub(self.reserved)
            .saturating_sub(self.committed)
    }
}

// ── Requirements ───────────────────────────────────────────────────

/// Units needed by each of the four operation groups of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRequirements {
    pub drain: u64,
    pub stabilize_first: u64,
    pub replenish: u64,
    pub stabilize_second: u64,
}

impl UnitRequirements {
    pub fn new(drain: u64, stabilize_first: u64, replenish: u64, stabilize_second: u64) -> Self {
        Self {
            drain,
            stabilize_first,
            replenish,
            stabilize_second,
        }
    }

    pub fn get(&self, stage: BatchStage) -> u64 {
        match stage {
            BatchStage::Drain => self.drain,
            BatchStage::StabilizeFirst => self.stabilize_first,
            BatchStage::Replenish => self.replenish,
            BatchStage::StabilizeSecond => self.stabilize_second,
        }
    }

    pub fn total(&self) -> u64 {
        self.drain
            .saturating_add(self.stabilize_first)
            .saturating_add(self.replenish)
            .saturating_add(self.stabilize_second)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
