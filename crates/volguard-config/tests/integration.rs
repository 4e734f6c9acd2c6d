//! Integration tests for volguard-config.
//!
//! Exercises the file-backed store end to end: persistence across reopen,
//! change notification, and tolerance of foreign keys written by other tools.

use tempfile::TempDir;
use volguard_config::{ConfigChange, ConfigStore, FileStore, LimiterConfig, TabId, Tuning};

#[test]
fn file_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tabs.toml");

    let store = FileStore::open(&path).expect("open new store");
    store.set(TabId(4), LimiterConfig::new(true, -18.0)).unwrap();
    store.set(TabId(9), LimiterConfig::new(false, -30.0)).unwrap();
    assert!(path.exists(), "store should create parent dirs and file");

    let reopened = FileStore::open(&path).expect("reopen store");
    assert_eq!(reopened.get(TabId(4)).unwrap(), Some(LimiterConfig::new(true, -18.0)));
    assert_eq!(reopened.get(TabId(9)).unwrap(), Some(LimiterConfig::new(false, -30.0)));
}

#[test]
fn file_store_remove_erases_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.toml");

    let store = FileStore::open(&path).unwrap();
    store.set(TabId(1), LimiterConfig::new(true, -10.0)).unwrap();
    let rx = store.subscribe();
    assert_eq!(store.remove(TabId(1)).unwrap(), Some(LimiterConfig::new(true, -10.0)));
    assert_eq!(
        rx.try_recv().unwrap(),
        ConfigChange {
            tab: TabId(1),
            new_value: None
        }
    );

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get(TabId(1)).unwrap(), None);
}

#[test]
fn file_store_ignores_foreign_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.toml");
    std::fs::write(
        &path,
        "[tabs.3]\nenabled = true\nlimitDB = -12.0\n\n[tabs.theme]\nenabled = false\n",
    )
    .unwrap();

    let store = FileStore::open(&path).unwrap();
    let entries = store.entries().unwrap();
    assert_eq!(entries, vec![(TabId(3), LimiterConfig::new(true, -12.0))]);
}

#[test]
fn file_store_clear_notifies_each_tab() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("tabs.toml")).unwrap();
    store.set(TabId(1), LimiterConfig::default()).unwrap();
    store.set(TabId(2), LimiterConfig::default()).unwrap();

    let rx = store.subscribe();
    assert_eq!(store.clear().unwrap(), 2);
    let removed: Vec<TabId> = rx.try_iter().map(|c| c.tab).collect();
    assert_eq!(removed, vec![TabId(1), TabId(2)]);
    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn tuning_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let tuning = Tuning::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(tuning, Tuning::default());
}

#[test]
fn tuning_file_overrides_and_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tuning.toml");

    std::fs::write(&path, "history_capacity = 8\nretry_max_attempts = 2\n").unwrap();
    let tuning = Tuning::load(&path).unwrap();
    assert_eq!(tuning.history_capacity, 8);
    assert_eq!(tuning.retry_max_attempts, 2);

    std::fs::write(&path, "ema_alpha = -1.0\n").unwrap();
    assert!(Tuning::load(&path).is_err());
}
