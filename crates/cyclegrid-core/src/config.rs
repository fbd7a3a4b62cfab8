//! cyclegrid.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spacing between consecutive operation completions.
pub const DEFAULT_STEP_MS: u64 = 50;
/// Spacing between cycle launches: one full completion window of four steps.
pub const DEFAULT_SLOT_INTERVAL_MS: u64 = 4 * DEFAULT_STEP_MS;
/// Extra time slept after a deployment's last completion.
pub const DEFAULT_SETTLE_MARGIN_MS: u64 = 100;
pub const DEFAULT_DRAIN_PERCENT: f64 = 0.5;
/// Memory kept free on the home node when it is allowed to take work.
pub const HOME_RESERVED_MEMORY: f64 = 64.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("drain_percent must be in (0, 1], got {0}")]
    DrainPercent(f64),
    #[error("step_ms must be greater than zero")]
    ZeroStep,
    #[error("max_saturation must be at least 1 (omit it for unlimited)")]
    ZeroSaturation,
    #[error("slot_interval_ms ({slot}) must be at least step_ms ({step})")]
    SlotInterval { slot: u64, step: u64 },
    #[error("simulation needs at least one node")]
    NoNodes,
    #[error("unit_memory must be greater than zero")]
    UnitMemory,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Knobs for the batch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Fraction of the target's max resource drained per cycle.
    pub drain_percent: f64,
    /// Whether the privileged (home) node may take work.
    pub use_privileged: bool,
    /// Upper bound on cycles per window. `None` means unlimited.
    pub max_saturation: Option<u32>,
    pub step_ms: u64,
    pub slot_interval_ms: u64,
    pub settle_margin_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            drain_percent: DEFAULT_DRAIN_PERCENT,
            use_privileged: false,
            max_saturation: None,
            step_ms: DEFAULT_STEP_MS,
            slot_interval_ms: DEFAULT_SLOT_INTERVAL_MS,
            settle_margin_ms: DEFAULT_SETTLE_MARGIN_MS,
        }
    }
}

impl BatchConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn slot_interval(&self) -> Duration {
        Duration::from_millis(self.slot_interval_ms)
    }

    pub fn settle_margin(&self) -> Duration {
        Duration::from_millis(self.settle_margin_ms)
    }

    /// Translate the command-line convention where `-1` means unlimited.
    pub fn saturation_cap_from_flag(flag: i64) -> Option<u32> {
        if flag < 0 {
            None
        } else {
            Some(u32::try_from(flag).unwrap_or(u32::MAX))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.drain_percent > 0.0 && self.drain_percent <= 1.0) {
            return Err(ConfigError::DrainPercent(self.drain_percent));
        }
        if self.step_ms == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.max_saturation == Some(0) {
            return Err(ConfigError::ZeroSaturation);
        }
        if self.slot_interval_ms < self.step_ms {
            return Err(ConfigError::SlotInterval {
                slot: self.slot_interval_ms,
                step: self.step_ms,
            });
        }
        Ok(())
    }
}

/// A simulated worker node, sized in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimNodeConfig {
    pub id: String,
    pub memory: f64,
}

/// Parameters of the in-process simulated target and cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub target: String,
    pub stabilize_ms: u64,
    pub drain_ratio: f64,
    pub replenish_ratio: f64,
    pub min_penalty: f64,
    pub initial_penalty: f64,
    pub max_resource: f64,
    pub initial_resource: f64,
    /// Fraction of the current resource removed per drain unit.
    pub drain_fraction: f64,
    /// Growth per replenish unit.
    pub growth_rate: f64,
    pub home_memory: f64,
    pub home_reserved: f64,
    /// Memory cost of a single unit of work.
    pub unit_memory: f64,
    pub nodes: Vec<SimNodeConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target: "joesguns".to_string(),
            stabilize_ms: 4000,
            drain_ratio: 0.25,
            replenish_ratio: 0.8,
            min_penalty: 5.0,
            initial_penalty: 12.0,
            max_resource: 1_000_000.0,
            initial_resource: 250_000.0,
            drain_fraction: 0.01,
            growth_rate: 0.02,
            home_memory: 128.0,
            home_reserved: HOME_RESERVED_MEMORY,
            unit_memory: 1.75,
            nodes: vec![
                SimNodeConfig {
                    id: "n00dles".to_string(),
                    memory: 1024.0,
                },
                SimNodeConfig {
                    id: "foodnstuff".to_string(),
                    memory: 2048.0,
                },
                SimNodeConfig {
                    id: "sigma-cosmetics".to_string(),
                    memory: 1024.0,
                },
            ],
        }
    }
}

impl SimulationConfig {
    pub fn stabilize_time(&self) -> Duration {
        Duration::from_millis(self.stabilize_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.unit_memory <= 0.0 {
            return Err(ConfigError::UnitMemory);
        }
        Ok(())
    }
}

impl GridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GridConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batch.validate()?;
        self.simulation.validate()
    }
}
