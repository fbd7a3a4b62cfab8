use cyclegrid_core::{BatchConfig, GridConfig};
use cyclegrid_scheduler::Orchestrator;
use cyclegrid_sim::SimCluster;
use tokio::sync::watch;
use tracing::{error, info};

use super::load_config;
use crate::SimulateArgs;

/// Command-line flags win over file values; absent flags leave them alone.
pub fn apply_overrides(config: &mut GridConfig, args: &SimulateArgs) {
    if let Some(p) = args.drain_percent {
        config.batch.drain_percent = p;
    }
    if args.use_home {
        config.batch.use_privileged = true;
    }
    if let Some(s) = args.max_saturation {
        config.batch.max_saturation = BatchConfig::saturation_cap_from_flag(s);
    }
}

pub async fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.batch.validate()?;

    let sim = SimCluster::from_config(&config.simulation)?;
    let target = config.simulation.target.clone();
    let orchestrator = Orchestrator::new(target.clone(), sim.clone(), config.batch)?;
    info!(%target, windows = args.windows, "simulation starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing current window");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = match orchestrator.run(shutdown_rx, Some(args.windows)).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(%target, error = %e, "simulation aborted");
            return Err(e.into());
        }
    };

    let completions = sim.completions();
    if args.json {
        let report = serde_json::json!({
            "target": target,
            "windows": summary.windows,
            "cycles": summary.cycles,
            "preps": summary.preps,
            "launched": sim.launched_total(),
            "completions": completions.len(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✓ Simulated {} windows on {target}", summary.windows);
        println!("  Cycles:      {}", summary.cycles);
        println!("  Preps:       {}", summary.preps);
        println!("  Launched:    {}", sim.launched_total());
        println!("  Completions: {}", completions.len());
    }

    info!(%target, "simulation stopped");
    Ok(())
}
