//! cyclegrid-scheduler — timing, deployment and the batch control loop.
//!
//! Turns the allocation engine's placements into launched work whose
//! completions land in a fixed order, then pipelines cycles across the
//! target's stabilize window. The scheduler:
//!
//! - Computes per-stage start offsets so completions are one step apart
//! - Launches every placement through the [`Launcher`] seam
//! - Derives per-cycle and prep unit requirements from a [`CostModel`]
//! - Runs the prep → window → prep loop, failing fast on any shortfall
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── Backend (TargetProbe + NodeInventory + CostModel + Launcher)
//!   ├── requirements (units per cycle / prep)
//!   ├── cyclegrid_placement::distribute (where units go)
//!   └── deploy
//!       └── CycleTiming (when each group starts)
//! ```

pub mod backend;
pub mod deploy;
pub mod error;
pub mod orchestrator;
pub mod requirements;
pub mod timing;

pub use backend::{
    Backend, CostModel, LaunchError, LaunchHandle, LaunchRequest, Launcher, NodeInventory,
    TargetProbe,
};
pub use deploy::{Deployment, LaunchedWork, deploy};
pub use error::{SchedulerError, SchedulerResult};
pub use orchestrator::{Orchestrator, PrepOutcome, RunSummary, WindowReport};
pub use requirements::{cycle_requirements, prep_requirements};
pub use timing::{CycleTiming, StageTiming};
