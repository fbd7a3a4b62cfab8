use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "cyclegrid",
    about = "CycleGrid — pipelined four-stage batch scheduler",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prep a simulated target and run saturated windows against it.
    Simulate(SimulateArgs),
    /// Allocate one cycle on the configured nodes and print the placement
    /// and timing as JSON.
    Plan(PlanArgs),
    /// Write a cyclegrid.toml with every default spelled out.
    Init {
        /// Output file.
        #[arg(short, long, default_value = "cyclegrid.toml")]
        output: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Configuration file (defaults are used when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Fraction of the target's max resource drained per cycle.
    #[arg(short = 'p', long)]
    pub drain_percent: Option<f64>,
    /// Allow the home node to take work.
    #[arg(long)]
    pub use_home: bool,
    /// Max cycles per window; -1 means unlimited.
    #[arg(short = 's', long, allow_negative_numbers = true)]
    pub max_saturation: Option<i64>,
    /// Number of windows to run before stopping.
    #[arg(long, default_value = "3")]
    pub windows: u32,
    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Configuration file (defaults are used when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub drain: u64,
    #[arg(long)]
    pub stabilize_first: u64,
    #[arg(long)]
    pub replenish: u64,
    #[arg(long)]
    pub stabilize_second: u64,
    /// Allow the home node to take work.
    #[arg(long)]
    pub use_home: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cyclegrid=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Simulate(args) => commands::simulate::simulate(args).await,
        Commands::Plan(args) => commands::plan::plan(args),
        Commands::Init { output, force } => commands::plan::init(&output, force),
    }
}
