//! Shared helpers for CLI commands.

use std::path::PathBuf;

use anyhow::Context;
use volguard_config::{FileStore, Tuning, default_store_path, default_tuning_path};

/// Open the config store at `path`, or the per-user default.
pub fn open_store(path: Option<PathBuf>) -> anyhow::Result<FileStore> {
    let path = path.unwrap_or_else(default_store_path);
    FileStore::open(&path).with_context(|| format!("opening config store {}", path.display()))
}

/// Load tuning from `path` (must exist), or the per-user default file if
/// present, or built-in defaults.
pub fn load_tuning(path: Option<PathBuf>) -> anyhow::Result<Tuning> {
    match path {
        Some(path) => {
            Tuning::load(&path).with_context(|| format!("loading tuning {}", path.display()))
        }
        None => Ok(Tuning::load_or_default(default_tuning_path())?),
    }
}
