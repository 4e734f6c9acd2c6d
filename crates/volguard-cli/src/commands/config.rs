//! Stored per-tab limiter config.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use volguard_config::{ConfigPatch, ConfigStore, TabId};

use super::common::open_store;
use crate::status::format_db;

#[derive(Args)]
pub struct ConfigArgs {
    /// Config store file (defaults to the per-user store)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show one tab's config, or every stored tab
    Show {
        /// Tab id
        tab: Option<TabId>,
    },

    /// Change a tab's config
    Set {
        /// Tab id
        tab: TabId,

        /// Turn limiting on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn limiting off
        #[arg(long)]
        disable: bool,

        /// Ceiling in dBFS (clamped to -60..0)
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<f32>,
    },

    /// Remove one tab's config, or all of them
    Clear {
        /// Tab id
        tab: Option<TabId>,
    },

    /// Print the store location
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let store = open_store(args.store)?;

    match args.command {
        ConfigCommand::Show { tab: Some(tab) } => {
            let stored = store.get(tab)?;
            let config = stored.unwrap_or_default();
            println!(
                "tab {tab}: {} limit {}{}",
                if config.enabled { "enabled" } else { "disabled" },
                format_db(config.limit_db),
                if stored.is_none() { " (default)" } else { "" }
            );
        }
        ConfigCommand::Show { tab: None } => {
            let entries = store.entries()?;
            if entries.is_empty() {
                println!("No stored tab config.");
            }
            for (tab, config) in entries {
                println!(
                    "tab {tab}: {} limit {}",
                    if config.enabled { "enabled" } else { "disabled" },
                    format_db(config.limit_db)
                );
            }
        }
        ConfigCommand::Set {
            tab,
            enable,
            disable,
            limit,
        } => {
            let mut patch = ConfigPatch::empty();
            if enable || disable {
                patch = patch.with_enabled(enable);
            }
            if let Some(limit) = limit {
                if !limit.is_finite() {
                    anyhow::bail!("--limit must be a finite number");
                }
                patch = patch.with_limit_db(limit);
            }
            if patch.is_empty() {
                anyhow::bail!("nothing to change; pass --enable, --disable or --limit");
            }

            let mut config = store.get_or_default(tab)?;
            patch.apply_to(&mut config);
            store.set(tab, config)?;
            println!(
                "tab {tab}: {} limit {}",
                if config.enabled { "enabled" } else { "disabled" },
                format_db(config.limit_db)
            );
        }
        ConfigCommand::Clear { tab: Some(tab) } => match store.remove(tab)? {
            Some(_) => println!("Cleared tab {tab}."),
            None => println!("Tab {tab} had no stored config."),
        },
        ConfigCommand::Clear { tab: None } => {
            let removed = store.clear()?;
            println!("Cleared {removed} tab config(s).");
        }
        ConfigCommand::Path => println!("{}", store.path().display()),
    }

    Ok(())
}
