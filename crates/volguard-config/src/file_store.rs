//! TOML-file-backed config store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::store::ChangeFeed;
use crate::{ConfigChange, ConfigError, ConfigStore, LimiterConfig, TabId};

/// On-disk layout: one table per tab, keyed by the tab id as a string.
///
/// ```toml
/// [tabs.12]
/// enabled = true
/// limitDB = -18.0
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    tabs: BTreeMap<String, LimiterConfig>,
}

#[derive(Debug)]
struct FileInner {
    path: PathBuf,
    entries: BTreeMap<TabId, LimiterConfig>,
    feed: ChangeFeed,
}

impl FileInner {
    fn flush(&self) -> Result<(), ConfigError> {
        let file = StoreFile {
            tabs: self
                .entries
                .iter()
                .map(|(tab, cfg)| (tab.to_string(), *cfg))
                .collect(),
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::write_file(&self.path, e))
    }
}

/// [`ConfigStore`] persisted to a TOML file.
///
/// The whole file is rewritten on every mutation. Keys that do not parse as a
/// tab id are skipped on load (with a warning) and dropped on the next write.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Mutex<FileInner>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::read_file(&path, e))?;
            parse_entries(&content)?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened config store");
        Ok(Self {
            inner: Arc::new(Mutex::new(FileInner {
                path,
                entries,
                feed: ChangeFeed::default(),
            })),
        })
    }

    /// Backing file path.
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }

    /// Remove every entry, notifying subscribers for each.
    pub fn clear(&self) -> Result<usize, ConfigError> {
        let mut inner = self.inner.lock();
        let tabs: Vec<TabId> = inner.entries.keys().copied().collect();
        inner.entries.clear();
        inner.flush()?;
        for tab in &tabs {
            inner.feed.publish(ConfigChange {
                tab: *tab,
                new_value: None,
            });
        }
        Ok(tabs.len())
    }
}

fn parse_entries(content: &str) -> Result<BTreeMap<TabId, LimiterConfig>, ConfigError> {
    let file: StoreFile = toml::from_str(content)?;
    let mut entries = BTreeMap::new();
    for (key, cfg) in file.tabs {
        let Ok(tab) = key.parse::<TabId>() else {
            tracing::warn!(key = %key, "ignoring non-tab key in config store");
            continue;
        };
        match cfg.validated() {
            Ok(cfg) => {
                entries.insert(tab, cfg);
            }
            Err(e) => tracing::warn!(tab = %tab, error = %e, "ignoring invalid stored config"),
        }
    }
    Ok(entries)
}

impl ConfigStore for FileStore {
    fn get(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError> {
        Ok(self.inner.lock().entries.get(&tab).copied())
    }

    fn set(&self, tab: TabId, config: LimiterConfig) -> Result<(), ConfigError> {
        let config = config.validated()?;
        let mut inner = self.inner.lock();
        let previous = inner.entries.insert(tab, config);
        if let Err(e) = inner.flush() {
            // Keep memory and disk in agreement.
            match previous {
                Some(prev) => inner.entries.insert(tab, prev),
                None => inner.entries.remove(&tab),
            };
            return Err(e);
        }
        inner.feed.publish(ConfigChange {
            tab,
            new_value: Some(config),
        });
        Ok(())
    }

    fn remove(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError> {
        let mut inner = self.inner.lock();
        let Some(removed) = inner.entries.remove(&tab) else {
            return Ok(None);
        };
        if let Err(e) = inner.flush() {
            inner.entries.insert(tab, removed);
            return Err(e);
        }
        inner.feed.publish(ConfigChange {
            tab,
            new_value: None,
        });
        Ok(Some(removed))
    }

    fn entries(&self) -> Result<Vec<(TabId, LimiterConfig)>, ConfigError> {
        Ok(self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(tab, cfg)| (*tab, *cfg))
            .collect())
    }

    fn subscribe(&self) -> Receiver<ConfigChange> {
        self.inner.lock().feed.subscribe()
    }
}
