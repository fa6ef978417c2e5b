mod animator;
mod args;
mod cli;
mod config;
mod error;
mod orchestrator;
mod output;
mod pipeline;
mod registry;

use anyhow::Result;
use clap::Parser;
use std::io;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::output::Console;
use crate::pipeline::SystemRunner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    if cli.no_color || !settings.display.color_enabled {
        colored::control::set_override(false);
    }

    let console = Console;
    console.banner();

    let runner = SystemRunner::new(settings.tools.clone());
    let mut orchestrator = Orchestrator::new(settings, runner, io::stdin().lock());

    let outcome = orchestrator.run().await;
    tracing::debug!(stage = ?orchestrator.stage(), "scan session ended");

    if let Err(e) = outcome {
        console.failure(&e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
