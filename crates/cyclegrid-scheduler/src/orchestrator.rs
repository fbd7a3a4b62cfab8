//! Orchestrator — the batch control loop.
//!
//! The `Orchestrator` drives one target:
//! - Preps it to baseline (minimum penalty, maximum resource) and verifies
//! - Computes how many cycles fit in one stabilize window
//! - Allocates and deploys each cycle from a fresh target snapshot, one slot apart
//! - Waits for the last cycle to finish, re-preps, and repeats
//!
//! The loop is single-threaded and cooperative. The only suspension
//! points are the slot sleep and the full-span sleep; launched work runs
//! on the nodes without reporting back. Every failure is fatal.

use std::time::Duration;

use cyclegrid_core::{BatchConfig, TargetState};
use cyclegrid_placement::distribute;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::deploy::deploy;
use crate::error::{SchedulerError, SchedulerResult};
use crate::requirements::{cycle_requirements, prep_requirements};

/// What `prep` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepOutcome {
    AlreadyPrepared,
    Prepared { duration: Duration },
}

/// Summary of one saturation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReport {
    pub saturation: u32,
    /// Duration estimate of the last cycle deployed.
    pub cycle_duration: Duration,
    pub launched: usize,
    pub failed_launches: usize,
}

/// Totals for a `run` that stopped on shutdown or window limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub windows: u32,
    pub cycles: u64,
    pub preps: u32,
}

/// Drives repeated batch cycles against a single target.
pub struct Orchestrator<B> {
    target: String,
    backend: B,
    config: BatchConfig,
}

impl<B: Backend> Orchestrator<B> {
    /// Create an orchestrator. Fails if the target is unknown or the
    /// configuration is invalid, before anything is launched.
    pub fn new(
        target: impl Into<String>,
        backend: B,
        config: BatchConfig,
    ) -> SchedulerResult<Self> {
        config.validate()?;
        let target = target.into();
        if backend.state(&target).is_none() {
            error!(%target, "invalid target");
            return Err(SchedulerError::InvalidTarget(target));
        }

        Ok(Self {
            target,
            backend,
            config,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Number of cycles launched per window for a given stabilize time.
    ///
    /// Floors `stabilize_time / slot_interval` with a minimum of one, then
    /// applies the configured cap. The cap is at least one once validated.
    pub fn saturation(&self, stabilize_time: Duration) -> u32 {
        let slot = self.config.slot_interval().as_nanos().max(1);
        let fit = u32::try_from(stabilize_time.as_nanos() / slot)
            .unwrap_or(u32::MAX)
            .max(1);
        match self.config.max_saturation {
            Some(cap) => fit.min(cap),
            None => fit,
        }
    }

    /// Bring the target to baseline if it is not there already.
    pub async fn prep(&self) -> SchedulerResult<PrepOutcome> {
        let state = self.target_state()?;
        let Some(req) = prep_requirements(&self.backend, &state) else {
            debug!(target = %self.target, "already prepared, skipping");
            return Ok(PrepOutcome::AlreadyPrepared);
        };

        let nodes = self.backend.nodes();
        let allocation = distribute(&req, &nodes, self.config.use_privileged).map_err(|source| {
            error!(target = %self.target, error = %source, "unable to allocate prep");
            SchedulerError::AllocationShortfall { active: 0, source }
        })?;

        let deployment = deploy(
            &allocation,
            &state,
            &self.backend,
            self.config.step(),
            self.config.settle_margin(),
        );
        info!(
            target = %self.target,
            duration_ms = deployment.duration.as_millis() as u64,
            stabilize = req.stabilize_first + req.stabilize_second,
            replenish = req.replenish,
            "preparing target"
        );
        tokio::time::sleep(deployment.duration).await;

        let after = self.target_state()?;
        if !after.is_at_baseline() {
            error!(
                target = %self.target,
                penalty = after.penalty,
                resource = after.resource,
                "target did not reach baseline"
            );
            return Err(SchedulerError::PrepVerification {
                target: self.target.clone(),
                penalty: after.penalty,
                min_penalty: after.min_penalty,
                resource: after.resource,
                max_resource: after.max_resource,
            });
        }

        info!(target = %self.target, "target prepared");
        Ok(PrepOutcome::Prepared {
            duration: deployment.duration,
        })
    }

    /// Launch one saturated window of cycles and wait for it to finish.
    pub async fn run_window(&self) -> SchedulerResult<WindowReport> {
        let state = self.target_state()?;
        let saturation = self.saturation(state.stabilize_time);
        info!(target = %self.target, saturation, "starting window");

        let mut cycle_duration = Duration::ZERO;
        let mut launched = 0;
        let mut failed_launches = 0;

        for active in 0..saturation {
            let state = self.target_state()?;
            let req = cycle_requirements(&self.backend, &state, self.config.drain_percent);
            let nodes = self.backend.nodes();

            let allocation = distribute(&req, &nodes, self.config.use_privileged).map_err(|source| {
                error!(
                    target = %self.target,
                    active,
                    error = %source,
                    "unable to run batch step"
                );
                SchedulerError::AllocationShortfall { active, source }
            })?;

            let deployment = deploy(
                &allocation,
                &state,
                &self.backend,
                self.config.step(),
                self.config.settle_margin(),
            );
            debug!(
                cycle = active,
                drain = req.drain,
                stabilize_first = req.stabilize_first,
                replenish = req.replenish,
                stabilize_second = req.stabilize_second,
                duration_ms = deployment.duration.as_millis() as u64,
                "cycle deployed"
            );

            cycle_duration = deployment.duration;
            launched += deployment.launched.len();
            failed_launches += deployment.failed;

            tokio::time::sleep(self.config.slot_interval()).await;
        }

        tokio::time::sleep(cycle_duration).await;
        info!(
            target = %self.target,
            saturation,
            cycle_ms = cycle_duration.as_millis() as u64,
            "completed window"
        );

        Ok(WindowReport {
            saturation,
            cycle_duration,
            launched,
            failed_launches,
        })
    }

    /// Prep, then alternate windows and preps until shutdown, the window
    /// limit, or a fatal error.
    ///
    /// Shutdown is only observed between windows. Work already launched
    /// is never cancelled.
    pub async fn run(
        &self,
        shutdown: watch::Receiver<bool>,
        max_windows: Option<u32>,
    ) -> SchedulerResult<RunSummary> {
        let mut summary = RunSummary::default();

        if let PrepOutcome::Prepared { .. } = self.prep().await? {
            summary.preps += 1;
        }

        loop {
            if *shutdown.borrow() {
                info!(target = %self.target, "shutdown requested, stopping");
                break;
            }
            if max_windows.is_some_and(|max| summary.windows >= max) {
                break;
            }

            let report = self.run_window().await?;
            summary.windows += 1;
            summary.cycles += u64::from(report.saturation);

            if let PrepOutcome::Prepared { .. } = self.prep().await? {
                summary.preps += 1;
            }
        }

        Ok(summary)
    }

    fn target_state(&self) -> SchedulerResult<TargetState> {
        self.backend
            .state(&self.target)
            .ok_or_else(|| SchedulerError::InvalidTarget(self.target.clone()))
    }
}
