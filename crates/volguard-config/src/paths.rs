//! Platform-specific paths for configuration files.
//!
//! - **User config**: `~/.config/volguard/` (Linux), `~/Library/Application Support/volguard/` (macOS), `%APPDATA%\volguard\` (Windows)
//! - **Tab store**: `<user config>/tabs.toml`
//! - **Tuning**: `<user config>/tuning.toml`

use std::path::PathBuf;

use crate::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "volguard";

/// File name of the per-tab config store.
const STORE_FILE: &str = "tabs.toml";

/// File name of the tuning overrides.
const TUNING_FILE: &str = "tuning.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the per-tab config store.
pub fn default_store_path() -> PathBuf {
    user_config_dir().join(STORE_FILE)
}

/// Default location of the tuning file.
pub fn default_tuning_path() -> PathBuf {
    user_config_dir().join(TUNING_FILE)
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}
