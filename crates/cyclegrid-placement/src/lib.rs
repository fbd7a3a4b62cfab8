//! cyclegrid allocation engine — fits one cycle's units onto nodes.
//!
//! This crate only decides *where* units go. It does not launch anything
//! and holds no state between calls: the remaining capacity of each
//! allocation is returned to the caller, who can thread it into the next
//! call with [`apply_remaining`].
//!
//! # Components
//!
//! - **`order`** — Node eligibility and stable ordering (privileged node last)
//! - **`distribute`** — Greedy split allocation of the four operation groups
//! - **`convert`** — Memory-sized hosts to unit-slot capacities

pub mod convert;
pub mod distribute;
pub mod error;
pub mod order;

pub use convert::{HostMemory, node_from_memory, nodes_from_memory};
pub use distribute::{ALLOCATION_ORDER, Allocation, Placement, apply_remaining, distribute};
pub use error::{PlacementError, PlacementResult};
pub use order::{eligible_nodes, has_unique_ids, total_available};
