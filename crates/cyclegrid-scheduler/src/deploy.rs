//! Deployment — launches an allocation with staggered offsets.
//!
//! Takes an `Allocation` from the placement engine and a fresh target
//! snapshot, computes the [`CycleTiming`], and issues one launch per
//! `(node, units)` pair. Failed launches are logged and counted but not
//! compensated; the returned handles are for observability only.

use std::time::Duration;

use cyclegrid_core::{BatchStage, TargetState};
use cyclegrid_placement::Allocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{LaunchHandle, LaunchRequest, Launcher};
use crate::timing::CycleTiming;

/// One successfully launched group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchedWork {
    pub stage: BatchStage,
    pub node_id: String,
    pub units: u64,
    pub delay: Duration,
    pub handle: LaunchHandle,
}

/// Result of deploying one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Dispatch to last completion plus the settle margin.
    pub duration: Duration,
    pub timing: CycleTiming,
    pub launched: Vec<LaunchedWork>,
    pub failed: usize,
}

/// Launch every placement of `allocation` against `target`.
pub fn deploy<L>(
    allocation: &Allocation,
    target: &TargetState,
    launcher: &L,
    step: Duration,
    settle_margin: Duration,
) -> Deployment
where
    L: Launcher + ?Sized,
{
    let timing = CycleTiming::for_target(target, step);
    let mut launched = Vec::new();
    let mut failed = 0;

    for stage in BatchStage::FINISH_ORDER {
        let delay = timing.offset(stage);

        for placement in allocation.placements(stage) {
            if placement.units == 0 {
                continue;
            }

            let request = LaunchRequest {
                kind: stage.kind(),
                node_id: placement.node_id.clone(),
                units: placement.units,
                target: target.id.clone(),
                delay,
            };

            match launcher.launch(&request) {
                Ok(handle) => {
                    debug!(
                        stage = %stage,
                        node = %placement.node_id,
                        units = placement.units,
                        delay_ms = delay.as_millis() as u64,
                        "launched"
                    );
                    launched.push(LaunchedWork {
                        stage,
                        node_id: placement.node_id.clone(),
                        units: placement.units,
                        delay,
                        handle,
                    });
                }
                Err(e) => {
                    failed += 1;
                    warn!(stage = %stage, error = %e, "launch failed");
                }
            }
        }
    }

    Deployment {
        duration: timing.span() + settle_margin,
        timing,
        launched,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use cyclegrid_core::OperationKind;
    use cyclegrid_placement::Placement;

    use super::*;
    use crate::backend::LaunchError;

    #[derive(Default)]
    struct RecordingLauncher {
        requests: Mutex<Vec<LaunchRequest>>,
        reject_node: Option<String>,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&self, request: &LaunchRequest) -> Result<LaunchHandle, LaunchError> {
            if self.reject_node.as_deref() == Some(request.node_id.as_str()) {
                return Err(LaunchError::Rejected {
                    kind: request.kind,
                    node_id: request.node_id.clone(),
                    reason: "out of memory".to_string(),
                });
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(LaunchHandle(requests.len() as u64))
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn target() -> TargetState {
        TargetState {
            id: "joesguns".to_string(),
            penalty: 5.0,
            min_penalty: 5.0,
            resource: 1000.0,
            max_resource: 1000.0,
            drain_time: ms(1600),
            replenish_time: ms(3200),
            stabilize_time: ms(4000),
        }
    }

    fn place(node: &str, units: u64) -> Placement {
        Placement {
            node_id: node.to_string(),
            units,
        }
    }

    fn sample_allocation() -> Allocation {
        Allocation {
            drain: vec![place("a", 30)],
            stabilize_first: vec![place("a", 1), place("b", 1)],
            replenish: vec![place("b", 12)],
            stabilize_second: vec![place("b", 1)],
            ..Allocation::default()
        }
    }

    #[test]
    fn launches_every_placement_with_stage_offset() {
        let launcher = RecordingLauncher::default();

        let deployment = deploy(&sample_allocation(), &target(), &launcher, ms(50), ms(100));

        let requests = launcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 5);
        assert_eq!(deployment.launched.len(), 5);
        assert_eq!(deployment.failed, 0);

        let drain = requests.iter().find(|r| r.kind == OperationKind::Drain).unwrap();
        assert_eq!(drain.delay, ms(2350));
        assert_eq!(drain.units, 30);
        assert_eq!(drain.target, "joesguns");

        let replenish = requests.iter().find(|r| r.kind == OperationKind::Replenish).unwrap();
        assert_eq!(replenish.delay, ms(850));

        let stabilize_delays: Vec<Duration> = requests
            .iter()
            .filter(|r| r.kind == OperationKind::Stabilize)
            .map(|r| r.delay)
            .collect();
        assert_eq!(stabilize_delays, vec![ms(0), ms(0), ms(100)]);
    }

    #[test]
    fn duration_is_span_plus_margin() {
        let launcher = RecordingLauncher::default();
        let deployment = deploy(&sample_allocation(), &target(), &launcher, ms(50), ms(100));
        assert_eq!(deployment.duration, ms(4000 + 100 + 100));
    }

    #[test]
    fn skips_zero_unit_placements() {
        let launcher = RecordingLauncher::default();
        let allocation = Allocation {
            drain: vec![place("a", 0)],
            stabilize_first: vec![place("a", 4)],
            ..Allocation::default()
        };

        let deployment = deploy(&allocation, &target(), &launcher, ms(50), ms(100));

        assert_eq!(deployment.launched.len(), 1);
        assert_eq!(deployment.launched[0].stage, BatchStage::StabilizeFirst);
    }

    #[test]
    fn failed_launch_is_counted_not_fatal() {
        let launcher = RecordingLauncher {
            reject_node: Some("b".to_string()),
            ..RecordingLauncher::default()
        };

        let deployment = deploy(&sample_allocation(), &target(), &launcher, ms(50), ms(100));

        assert_eq!(deployment.failed, 3);
        assert_eq!(deployment.launched.len(), 2);
        assert!(deployment.launched.iter().all(|w| w.node_id == "a"));
    }

    #[test]
    fn empty_allocation_launches_nothing() {
        let launcher = RecordingLauncher::default();
        let deployment = deploy(&Allocation::default(), &target(), &launcher, ms(50), ms(100));

        assert!(deployment.launched.is_empty());
        assert_eq!(deployment.duration, ms(4200));
    }
}
