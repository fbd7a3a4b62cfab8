//! Effects of each operation on a simulated target, and their inverse.

use std::time::Duration;

use cyclegrid_core::{OperationKind, SimulationConfig, TargetState};

/// Penalty added per drain unit.
pub const DRAIN_PENALTY_PER_UNIT: f64 = 0.002;
/// Penalty added per replenish unit.
pub const REPLENISH_PENALTY_PER_UNIT: f64 = 0.004;
/// Penalty removed per stabilize unit.
pub const STABILIZE_PER_UNIT: f64 = 0.05;

/// Mutable state of the simulated target.
#[derive(Debug, Clone, PartialEq)]
pub struct SimTarget {
    pub id: String,
    pub penalty: f64,
    pub min_penalty: f64,
    pub resource: f64,
    pub max_resource: f64,
}

/// Fixed parameters of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub stabilize_time: Duration,
    pub drain_ratio: f64,
    pub replenish_ratio: f64,
    pub drain_fraction: f64,
    pub growth_rate: f64,
}

impl SimParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            stabilize_time: config.stabilize_time(),
            drain_ratio: config.drain_ratio,
            replenish_ratio: config.replenish_ratio,
            drain_fraction: config.drain_fraction,
            growth_rate: config.growth_rate,
        }
    }

    pub fn duration(&self, kind: OperationKind) -> Duration {
        match kind {
            OperationKind::Stabilize => self.stabilize_time,
            OperationKind::Drain => self.stabilize_time.mul_f64(self.drain_ratio),
            OperationKind::Replenish => self.stabilize_time.mul_f64(self.replenish_ratio),
        }
    }

    /// Drain units to remove `amount` from `resource`.
    pub fn drain_units(&self, resource: f64, amount: f64) -> f64 {
        let per_unit = resource * self.drain_fraction;
        if per_unit <= 0.0 {
            return 0.0;
        }
        amount / per_unit
    }

    /// Replenish units to multiply the resource by `multiplier`.
    pub fn replenish_units(&self, multiplier: f64) -> f64 {
        if multiplier <= 1.0 || self.growth_rate <= 0.0 {
            return 0.0;
        }
        multiplier.ln() / (1.0 + self.growth_rate).ln()
    }
}

impl SimTarget {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            id: config.target.clone(),
            penalty: config.initial_penalty.max(config.min_penalty),
            min_penalty: config.min_penalty,
            resource: config.initial_resource.clamp(0.0, config.max_resource),
            max_resource: config.max_resource,
        }
    }

    /// Apply the completion of `units` of `kind`.
    pub fn apply(&mut self, kind: OperationKind, units: u64, params: &SimParams) {
        let n = units as f64;
        match kind {
            OperationKind::Drain => {
                let taken = (self.resource * params.drain_fraction * n).min(self.resource);
                self.resource -= taken;
                self.penalty += DRAIN_PENALTY_PER_UNIT * n;
            }
            OperationKind::Replenish => {
                let grown = (self.resource + n) * (1.0 + params.growth_rate).powf(n);
                self.resource = grown.min(self.max_resource);
                self.penalty += REPLENISH_PENALTY_PER_UNIT * n;
            }
            OperationKind::Stabilize => {
                self.penalty = (self.penalty - STABILIZE_PER_UNIT * n).max(self.min_penalty);
            }
        }
    }

    pub fn snapshot(&self, params: &SimParams) -> TargetState {
        TargetState {
            id: self.id.clone(),
            penalty: self.penalty,
            min_penalty: self.min_penalty,
            resource: self.resource,
            max_resource: self.max_resource,
            drain_time: params.duration(OperationKind::Drain),
            replenish_time: params.duration(OperationKind::Replenish),
            stabilize_time: params.duration(OperationKind::Stabilize),
        }
    }
}

/// Stabilize units needed to remove `penalty`.
pub fn stabilize_units(penalty: f64) -> u64 {
    if penalty <= 0.0 {
        return 0;
    }
    (penalty / STABILIZE_PER_UNIT).ceil() as u64
}
