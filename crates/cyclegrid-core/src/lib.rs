pub mod config;
pub mod types;

pub use config::{BatchConfig, ConfigError, GridConfig, SimNodeConfig, SimulationConfig};
pub use types::*;
