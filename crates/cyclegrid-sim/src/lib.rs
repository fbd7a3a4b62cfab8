//! cyclegrid-sim — an in-process backend for the batch loop.
//!
//! Implements every scheduler seam (target probe, node inventory, cost
//! model, launcher) against a simulated target whose penalty and
//! resource react to completed work. Used by the `simulate` command and
//! by the end-to-end tests.
//!
//! # Components
//!
//! - **`model`** — Per-operation effects and their exact inverse cost formulas
//! - **`cluster`** — `SimCluster`: shared state, lazy completion, capacity accounting

pub mod cluster;
pub mod model;

pub use cluster::{Completion, HOME_NODE, SimCluster, completion_gaps};
pub use model::{SimParams, SimTarget};
