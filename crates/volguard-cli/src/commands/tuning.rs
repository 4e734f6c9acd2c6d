//! Effective tuning.

use std::path::PathBuf;

use clap::Args;
use volguard_config::default_tuning_path;

use super::common::load_tuning;

#[derive(Args)]
pub struct TuningArgs {
    /// Tuning file (defaults to the per-user file, then built-in values)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Print only the default file location
    #[arg(long)]
    path: bool,
}

pub fn run(args: TuningArgs) -> anyhow::Result<()> {
    if args.path {
        println!("{}", default_tuning_path().display());
        return Ok(());
    }

    let tuning = load_tuning(args.tuning)?;
    tuning.validate()?;
    print!("{}", tuning.to_toml()?);
    Ok(())
}
