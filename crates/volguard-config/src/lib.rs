//! Configuration for volguard.
//!
//! This crate owns everything the limiter is told from the outside: the per-tab
//! on/off switch and ceiling, the tunable timing constants, and the persisted
//! store those live in.
//!
//! # Features
//!
//! - **Limiter config**: [`LimiterConfig`] and partial updates via [`ConfigPatch`]
//! - **Tuning**: [`Tuning`] timing and aggregation constants, loadable from TOML
//! - **Stores**: [`ConfigStore`] keyed by [`TabId`], with change notification;
//!   [`MemoryStore`] for in-process use and [`FileStore`] for a TOML file
//! - **Paths**: Platform-specific config locations
//!
//! # Example
//!
//! ```rust
//! use volguard_config::{ConfigStore, LimiterConfig, MemoryStore, TabId};
//!
//! let store = MemoryStore::new();
//! let changes = store.subscribe();
//!
//! store.set(TabId(7), LimiterConfig::new(true, -18.0)).unwrap();
//! let change = changes.try_recv().unwrap();
//! assert_eq!(change.tab, TabId(7));
//! assert_eq!(change.new_value, Some(LimiterConfig::new(true, -18.0)));
//! ```

mod error;
mod file_store;
mod limiter;
mod store;
mod tab;
mod tuning;

/// Platform-specific paths for configuration files.
pub mod paths;

pub use error::ConfigError;
pub use file_store::FileStore;
pub use limiter::{ConfigPatch, LIMIT_MAX_DB, LIMIT_MIN_DB, LimiterConfig};
pub use paths::{default_store_path, default_tuning_path, ensure_user_config_dir, user_config_dir};
pub use store::{ConfigChange, ConfigStore, MemoryStore};
pub use tab::TabId;
pub use tuning::Tuning;
