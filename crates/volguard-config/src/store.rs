//! Persisted per-tab configuration with change notification.
//!
//! The store is the single source of truth for limiter settings. Whoever writes
//! to it (usually the status surface) does not talk to page agents directly;
//! the aggregator subscribes to [`ConfigChange`]s and relays them to the one
//! affected tab.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::{ConfigError, LimiterConfig, TabId};

/// One store mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigChange {
    /// Tab whose entry changed.
    pub tab: TabId,
    /// New value, or `None` if the entry was removed.
    pub new_value: Option<LimiterConfig>,
}

/// Keyed storage for [`LimiterConfig`]s.
///
/// Handles are cheap to clone and share one underlying store, so the
/// aggregator and a status surface can both hold one.
pub trait ConfigStore: Send + Sync {
    /// Stored config for `tab`, if any.
    fn get(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError>;

    /// Store `config` for `tab` and notify subscribers.
    fn set(&self, tab: TabId, config: LimiterConfig) -> Result<(), ConfigError>;

    /// Remove the entry for `tab`, notifying subscribers if one existed.
    fn remove(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError>;

    /// All stored entries, ordered by tab.
    fn entries(&self) -> Result<Vec<(TabId, LimiterConfig)>, ConfigError>;

    /// Receive every future change.
    fn subscribe(&self) -> Receiver<ConfigChange>;

    /// Stored config for `tab`, or the default if none is stored.
    fn get_or_default(&self, tab: TabId) -> Result<LimiterConfig, ConfigError> {
        Ok(self.get(tab)?.unwrap_or_default())
    }
}

/// Fan-out of [`ConfigChange`]s to subscribers.
///
/// Subscribers whose receiver has been dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub(crate) struct ChangeFeed {
    subscribers: Vec<Sender<ConfigChange>>,
}

impl ChangeFeed {
    pub(crate) fn subscribe(&mut self) -> Receiver<ConfigChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn publish(&mut self, change: ConfigChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<TabId, LimiterConfig>,
    feed: ChangeFeed,
}

/// In-process [`ConfigStore`].
///
/// # Example
///
/// ```rust
/// use volguard_config::{ConfigStore, LimiterConfig, MemoryStore, TabId};
///
/// let store = MemoryStore::new();
/// assert_eq!(store.get_or_default(TabId(1)).unwrap(), LimiterConfig::default());
///
/// store.set(TabId(1), LimiterConfig::new(true, -12.0)).unwrap();
/// assert_eq!(store.get(TabId(1)).unwrap(), Some(LimiterConfig::new(true, -12.0)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError> {
        Ok(self.inner.lock().entries.get(&tab).copied())
    }

    fn set(&self, tab: TabId, config: LimiterConfig) -> Result<(), ConfigError> {
        let config = config.validated()?;
        let mut inner = self.inner.lock();
        inner.entries.insert(tab, config);
        inner.feed.publish(ConfigChange {
            tab,
            new_value: Some(config),
        });
        Ok(())
    }

    fn remove(&self, tab: TabId) -> Result<Option<LimiterConfig>, ConfigError> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(&tab);
        if removed.is_some() {
            inner.feed.publish(ConfigChange {
                tab,
                new_value: None,
            });
        }
        Ok(removed)
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
