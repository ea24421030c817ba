#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Skirmish session.

mod config;
mod overlay;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::CliConfig;

/// Runs a scripted Skirmish session without a window and prints the outcome.
#[derive(Debug, Parser)]
#[command(name = "skirmish", version)]
struct Cli {
    /// Session configuration in TOML.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Collision map replacing the one named by the configuration.
    #[arg(long)]
    collision_map: Option<PathBuf>,
    /// Seed for roster placement.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u32>,
    /// Skips printing the ASCII grid.
    #[arg(long)]
    no_overlay: bool,
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(path) = cli.collision_map {
        config.collision_map = Some(path);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        config.ticks = ticks;
    }

    let report = session::run(&config)?;
    if !cli.no_overlay {
        println!("{}", report.overlay);
    }
    println!(
        "{} ms simulated, {} agents left, {} moves, {} waypoints, {} paths completed, {} paths failed, {} agents removed",
        report.elapsed_ms,
        report.agents,
        report.moves,
        report.waypoints,
        report.completed_paths,
        report.failed_paths,
        report.removed
    );
    Ok(())
}
