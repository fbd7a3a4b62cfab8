pub mod plan;
pub mod simulate;

use std::path::Path;

use cyclegrid_core::GridConfig;

/// Load the configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GridConfig> {
    match path {
        Some(path) => GridConfig::from_file(path),
        None => Ok(GridConfig::default()),
    }
}
