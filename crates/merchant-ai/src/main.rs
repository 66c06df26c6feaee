//! Merchant Simulation
//!
//! Runs a seeded market with one merchant group per archetype and prints a
//! JSON summary of how each merchant fared.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use market_events::Season;
use merchant_ai::config::DEFAULT_TUNING_PATH;
use merchant_ai::{AiConfig, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "merchant_sim")]
#[command(about = "Seeded marketplace simulation for merchant AI agents")]
struct Args {
    /// Random seed for reproducibility (overrides the tuning file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate (overrides the tuning file)
    #[arg(long)]
    ticks: Option<u64>,

    /// Tuning file; defaults are used when it does not exist
    #[arg(long, default_value = DEFAULT_TUNING_PATH)]
    config: PathBuf,

    /// Starting season (spring, summer, autumn, winter)
    #[arg(long)]
    season: Option<Season>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        match AiConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %args.config.display(), "could not load tuning file: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        AiConfig::default()
    };

    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(season) = args.season {
        config.simulation.season = season;
    }

    info!(
        seed = config.simulation.seed,
        ticks = config.simulation.ticks,
        season = %config.simulation.season,
        "starting merchant simulation"
    );

    let summary = match Simulation::new(&config).and_then(|mut sim| sim.run()) {
        Ok(summary) => summary,
        Err(e) => {
            error!("simulation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("could not serialize summary: {}", e);
            ExitCode::FAILURE
        }
    }
}
