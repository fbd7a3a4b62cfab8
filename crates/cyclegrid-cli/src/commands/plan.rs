use std::path::Path;

use cyclegrid_core::{GridConfig, TargetState, UnitRequirements};
use cyclegrid_placement::{Allocation, distribute};
use cyclegrid_scheduler::{CycleTiming, NodeInventory, TargetProbe};
use cyclegrid_sim::SimCluster;
use serde::Serialize;

use super::load_config;
use crate::PlanArgs;

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub target: TargetState,
    pub requirements: UnitRequirements,
    pub allocation: Allocation,
    pub timing: CycleTiming,
    pub span_ms: u64,
}

pub fn build_plan(
    config: &GridConfig,
    requirements: UnitRequirements,
    use_home: bool,
) -> anyhow::Result<PlanReport> {
    let sim = SimCluster::from_config(&config.simulation)?;
    let target = sim
        .state(&config.simulation.target)
        .ok_or_else(|| anyhow::anyhow!("invalid target: {}", config.simulation.target))?;

    let allocation = distribute(&requirements, &sim.nodes(), use_home)?;
    let timing = CycleTiming::for_target(&target, config.batch.step());

    Ok(PlanReport {
        span_ms: timing.span().as_millis() as u64,
        target,
        requirements,
        allocation,
        timing,
    })
}

pub fn plan(args: PlanArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let requirements = UnitRequirements::new(
        args.drain,
        args.stabilize_first,
        args.replenish,
        args.stabilize_second,
    );
    let use_home = args.use_home || config.batch.use_privileged;

    let report = build_plan(&config, requirements, use_home)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn init(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(output, GridConfig::default().to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
