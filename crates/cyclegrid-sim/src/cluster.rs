//! In-process simulated cluster.
//!
//! `SimCluster` owns one target and a list of nodes and implements every
//! scheduler seam. Launched work is queued with its completion instant;
//! completions are applied lazily, in instant order, whenever the state
//! is observed. Capacity is committed at launch and released at
//! completion. Time comes from `tokio::time`, so paused-clock tests see
//! the same behavior as real runs.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cyclegrid_core::{NodeCapacity, OperationKind, SimulationConfig, TargetState};
use cyclegrid_placement::{HostMemory, PlacementResult, nodes_from_memory};
use cyclegrid_scheduler::{
    CostModel, LaunchError, LaunchHandle, LaunchRequest, Launcher, NodeInventory, TargetProbe,
};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::model::{
    DRAIN_PENALTY_PER_UNIT, REPLENISH_PENALTY_PER_UNIT, SimParams, SimTarget, stabilize_units,
};

/// Node id used for the privileged host.
pub const HOME_NODE: &str = "home";

/// A completion that has been applied to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub kind: OperationKind,
    pub node_id: String,
    pub units: u64,
    pub finished_at: Instant,
    pub handle: LaunchHandle,
}

#[derive(Debug, Clone)]
struct PendingWork {
    kind: OperationKind,
    node_id: String,
    units: u64,
    finish_at: Instant,
    handle: LaunchHandle,
}

#[derive(Debug)]
struct SimState {
    target: SimTarget,
    nodes: Vec<NodeCapacity>,
    pending: Vec<PendingWork>,
    completions: Vec<Completion>,
    next_handle: u64,
    failing_nodes: HashSet<String>,
}

impl SimState {
    /// Apply every completion due at or before `now`, oldest first.
    fn settle(&mut self, now: Instant, params: &SimParams) {
        if self.pending.is_empty() {
            return;
        }
        // Handles are monotonic, so they break ties in launch order.
        self.pending.sort_by_key(|w| (w.finish_at, w.handle.0));
        let due = self.pending.partition_point(|w| w.finish_at <= now);

        for work in self.pending.drain(..due) {
            self.target.apply(work.kind, work.units, params);
            if let Some(node) = self.nodes.iter_mut().find(|n| n.node_id == work.node_id) {
                node.committed = node.committed.saturating_sub(work.units);
            }
            trace!(kind = %work.kind, units = work.units, node = %work.node_id, "work completed");
            self.completions.push(Completion {
                kind: work.kind,
                node_id: work.node_id,
                units: work.units,
                finished_at: work.finish_at,
                handle: work.handle,
            });
        }
    }
}

/// Shared handle to a simulated cluster. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct SimCluster {
    params: SimParams,
    inner: Arc<Mutex<SimState>>,
}

impl SimCluster {
    pub fn new(target: SimTarget, nodes: Vec<NodeCapacity>, params: SimParams) -> Self {
        Self {
            params,
            inner: Arc::new(Mutex::new(SimState {
                target,
                nodes,
                pending: Vec::new(),
                completions: Vec::new(),
                next_handle: 0,
                failing_nodes: HashSet::new(),
            })),
        }
    }

    /// Build a cluster from `[simulation]` config: configured nodes first,
    /// then the privileged home node with its reservation.
    pub fn from_config(config: &SimulationConfig) -> PlacementResult<Self> {
        let mut hosts: Vec<HostMemory> = config
            .nodes
            .iter()
            .map(|n| HostMemory {
                id: n.id.clone(),
                max_memory: n.memory,
                used_memory: 0.0,
                reserved_memory: 0.0,
                privileged: false,
            })
            .collect();
        hosts.push(HostMemory {
            id: HOME_NODE.to_string(),
            max_memory: config.home_memory,
            used_memory: 0.0,
            reserved_memory: config.home_reserved,
            privileged: true,
        });

        let nodes = nodes_from_memory(&hosts, config.unit_memory)?;
        Ok(Self::new(
            SimTarget::from_config(config),
            nodes,
            SimParams::from_config(config),
        ))
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Make every subsequent launch on `node_id` fail.
    pub fn fail_launches_on(&self, node_id: &str) {
        self.lock().failing_nodes.insert(node_id.to_string());
    }

    /// Overwrite the target's penalty and resource (after settling).
    pub fn perturb(&self, penalty: f64, resource: f64) {
        let mut state = self.settled();
        state.target.penalty = penalty;
        state.target.resource = resource;
    }

    /// Applied completions so far, in completion order.
    pub fn completions(&self) -> Vec<Completion> {
        self.settled().completions.clone()
    }

    /// Number of launched groups not yet completed.
    pub fn in_flight(&self) -> usize {
        self.settled().pending.len()
    }

    pub fn launched_total(&self) -> u64 {
        self.lock().next_handle
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settled(&self) -> MutexGuard<'_, SimState> {
        let mut state = self.lock();
        state.settle(Instant::now(), &self.params);
        state
    }
}

impl TargetProbe for SimCluster {
    fn state(&self, target: &str) -> Option<TargetState> {
        let state = self.settled();
        (state.target.id == target).then(|| state.target.snapshot(&self.params))
    }
}

impl NodeInventory for SimCluster {
    fn nodes(&self) -> Vec<NodeCapacity> {
        self.settled().nodes.clone()
    }
}

impl CostModel for SimCluster {
    fn drain_units(&self, target: &TargetState, amount: f64) -> f64 {
        self.params.drain_units(target.resource, amount)
    }

    fn drain_penalty(&self, units: u64) -> f64 {
        DRAIN_PENALTY_PER_UNIT * units as f64
    }

    fn replenish_units(&self, _target: &TargetState, multiplier: f64) -> f64 {
        self.params.replenish_units(multiplier)
    }

    fn replenish_penalty(&self, units: u64) -> f64 {
        REPLENISH_PENALTY_PER_UNIT * units as f64
    }

    fn stabilize_units(&self, penalty: f64) -> u64 {
        stabilize_units(penalty)
    }
}

impl Launcher for SimCluster {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchHandle, LaunchError> {
        let now = Instant::now();
        let mut state = self.settled();

        let reject = |reason: &str| LaunchError::Rejected {
            kind: request.kind,
            node_id: request.node_id.clone(),
            reason: reason.to_string(),
        };

        if state.target.id != request.target {
            return Err(reject("unknown target"));
        }
        if state.failing_nodes.contains(&request.node_id) {
            return Err(reject("injected failure"));
        }
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.node_id == request.node_id)
            .ok_or_else(|| reject("unknown node"))?;
        // The reservation only guards against the scheduler; the launch
        // primitive itself can use the whole host.
        if node.committed.saturating_add(request.units) > node.total {
            return Err(reject("not enough capacity"));
        }
        node.committed += request.units;

        let handle = LaunchHandle(state.next_handle);
        state.next_handle += 1;

        let finish_at = now + request.delay + self.params.duration(request.kind);
        debug!(
            kind = %request.kind,
            node = %request.node_id,
            units = request.units,
            finish_in_ms = (finish_at - now).as_millis() as u64,
            "sim launch"
        );
        state.pending.push(PendingWork {
            kind: request.kind,
            node_id: request.node_id.clone(),
            units: request.units,
            finish_at,
            handle,
        });

        Ok(handle)
    }
}

/// Elapsed time between consecutive completions, for ordering checks.
pub fn completion_gaps(completions: &[Completion]) -> Vec<Duration> {
    completions
        .windows(2)
        .map(|pair| pair[1].finished_at - pair[0].finished_at)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclegrid_core::SimNodeConfig;

    fn config() -> SimulationConfig {
        SimulationConfig {
            nodes: vec![
                SimNodeConfig {
                    id: "a".to_string(),
                    memory: 16.0,
                },
                SimNodeConfig {
                    id: "b".to_string(),
                    memory: 8.0,
                },
            ],
            home_memory: 32.0,
            home_reserved: 16.0,
            unit_memory: 2.0,
            ..SimulationConfig::default()
        }
    }

    fn request(kind: OperationKind, node: &str, units: u64, delay_ms: u64) -> LaunchRequest {
        LaunchRequest {
            kind,
            node_id: node.to_string(),
            units,
            target: "joesguns".to_string(),
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[test]
    fn from_config_appends_privileged_home() {
        let sim = SimCluster::from_config(&config()).unwrap();
        let nodes = sim.nodes();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].node_id, "a");
        assert_eq!(nodes[0].total, 8);
        assert_eq!(nodes[2].node_id, HOME_NODE);
        assert!(nodes[2].privileged);
        assert_eq!(nodes[2].available(), 8);
    }

    #[test]
    fn unknown_target_has_no_state() {
        let sim = SimCluster::from_config(&config()).unwrap();
        assert!(sim.state("joesguns").is_some());
        assert!(sim.state("megacorp").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn launch_commits_then_releases_capacity() {
        let sim = SimCluster::from_config(&config()).unwrap();

        sim.launch(&request(OperationKind::Stabilize, "a", 5, 0)).unwrap();
        assert_eq!(sim.nodes()[0].available(), 3);
        assert_eq!(sim.in_flight(), 1);

        tokio::time::sleep(Duration::from_millis(4000)).await;

        assert_eq!(sim.nodes()[0].available(), 8);
        assert_eq!(sim.in_flight(), 0);
        assert_eq!(sim.completions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completions_apply_in_finish_order() {
        let sim = SimCluster::from_config(&config()).unwrap();
        sim.perturb(5.0, 1_000_000.0);

        // Launched first but finishes last.
        sim.launch(&request(OperationKind::Stabilize, "a", 1, 100)).unwrap();
        sim.launch(&request(OperationKind::Drain, "b", 1, 0)).unwrap();

        tokio::time::sleep(Duration::from_millis(5000)).await;

        let done = sim.completions();
        assert_eq!(done[0].kind, OperationKind::Drain);
        assert_eq!(done[1].kind, OperationKind::Stabilize);
        assert_eq!(sim.state("joesguns").unwrap().penalty, 5.0);
    }

    #[test]
    fn injected_failure_rejects_launch() {
        let sim = SimCluster::from_config(&config()).unwrap();
        sim.fail_launches_on("b");

        assert!(sim.launch(&request(OperationKind::Drain, "b", 1, 0)).is_err());
        assert!(sim.launch(&request(OperationKind::Drain, "a", 1, 0)).is_ok());
        assert_eq!(sim.launched_total(), 1);
    }

    #[test]
    fn launch_beyond_host_is_rejected() {
        let sim = SimCluster::from_config(&config()).unwrap();
        assert!(sim.launch(&request(OperationKind::Drain, "b", 5, 0)).is_err());
        assert!(sim.launch(&request(OperationKind::Drain, "nowhere", 1, 0)).is_err());
    }

    #[test]
    fn cost_model_inverts_effects() {
        let sim = SimCluster::from_config(&config()).unwrap();
        sim.perturb(5.0, 1_000_000.0);
        let target = sim.state("joesguns").unwrap();

        let units = sim.drain_units(&target, 500_000.0);
        assert!((units - 500_000.0 / (1_000_000.0 * 0.01)).abs() < 1e-9);
        assert_eq!(sim.stabilize_units(sim.drain_penalty(50)), 2);
    }
}
