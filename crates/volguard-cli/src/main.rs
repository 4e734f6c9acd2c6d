//! Volguard CLI - drive simulated pages and manage stored limiter config.

mod commands;
mod status;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "volguard")]
#[command(author, version, about = "Loudness limiter for media pages", long_about = None)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run simulated tabs against a live aggregator
    Simulate(commands::simulate::SimulateArgs),

    /// Show or edit stored per-tab config
    Config(commands::config::ConfigArgs),

    /// Print the effective tuning
    Tuning(commands::tuning::TuningArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Tuning(args) => commands::tuning::run(args),
    }
}
