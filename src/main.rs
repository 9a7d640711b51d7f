use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use proofsweep::{
    config::{default_config, load_sweep_config, Configuration, SweepConfig},
    extract,
    sweep::RunExecutor,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Sweep a STARK prover over its parameter space and tabulate the logs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sweep config overriding the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the prover over every configuration of the grid
    Sweep,
    /// Rebuild the summary table from the result tree
    Extract,
    /// Sweep, then extract
    Run,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config: SweepConfig = match &cli.config {
        Some(path) => load_sweep_config(path)?,
        None => default_config()?,
    };
    match config.config_path() {
        Some(path) => info!("Using {} config from {}", config.config_type(), path.display()),
        None => info!("No config given, using built-in defaults"),
    }

    match cli.command {
        Commands::Sweep => {
            RunExecutor::new(config).run()?;
        }
        Commands::Extract => {
            extract::collect_results(&config)?;
        }
        Commands::Run => {
            RunExecutor::new(config.clone()).run()?;
            extract::collect_results(&config)?;
        }
    }

    Ok(())
}
