//! Alignment runner.
//!
//! Reads a run configuration, aligns the configured datasets and prints
//! verification scores.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mxalign_runner::{RunConfig, Runner};

#[derive(Parser, Debug)]
#[command(name = "mxalign")]
#[command(about = "Align forecast and observation datasets in time and space")]
struct Args {
    /// Run configuration file path
    #[arg(short, long, env = "MXALIGN_CONFIG")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    /// Stop after alignment
    #[arg(long)]
    skip_verify: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!(config = %args.config, "Starting alignment run");
    let config = RunConfig::load(&args.config)?;
    info!(datasets = ?config.datasets.keys().collect::<Vec<_>>(), "Loaded configuration");

    let mut runner = Runner::new(config);
    let report = runner.run(!args.skip_verify)?;

    for (name, path) in &report.outputs {
        info!(dataset = %name, path = %path, "Output");
    }
    if let Some(scores) = &report.scores {
        print!("{}", scores);
    }
    info!("Run complete");
    Ok(())
}
