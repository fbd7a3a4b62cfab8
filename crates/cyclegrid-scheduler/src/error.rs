//! Scheduler error types.

use cyclegrid_core::ConfigError;
use cyclegrid_placement::PlacementError;
use thiserror::Error;

/// Fatal conditions of the batch loop. None of them are retried.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("unable to place cycle ({active} cycles active): {source}")]
    AllocationShortfall {
        active: u32,
        #[source]
        source: PlacementError,
    },

    #[error(
        "unable to prepare {target}: penalty {penalty} (min {min_penalty}), resource {resource} (max {max_resource})"
    )]
    PrepVerification {
        target: String,
        penalty: f64,
        min_penalty: f64,
        resource: f64,
        max_resource: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
