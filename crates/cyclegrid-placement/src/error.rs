//! Placement error types.

use thiserror::Error;

/// Result type alias for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Errors that can occur while placing units on nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("insufficient capacity: {required} units required, {available} available")]
    InsufficientCapacity { required: u64, available: u64 },

    #[error("unit cost must be positive, got {0}")]
    InvalidUnitCost(String),
}
