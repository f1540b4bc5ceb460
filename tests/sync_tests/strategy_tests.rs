//! Tests for sync strategies driven by a Store
//!
//! These tests verify:
//! - EachUpdate flushes after every write
//! - None never flushes on writes
//! - OnTransaction flushes once per committed transaction
//! - Periodic flushes in the background and once more on close
//! - Custom strategies plug in through `create_with_strategy`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mmapkv::config::{Config, SyncPolicy};
use mmapkv::sync::{PeriodicSync, SyncStrategy, Syncable};
use mmapkv::{Result, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_with(temp_dir: &TempDir, policy: SyncPolicy) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .capacity(1024 * 1024)
        .sync_policy(policy)
        .build()
}

/// Forwards flushes to the real region while counting them
struct CountingSyncable {
    inner: Arc<dyn Syncable>,
    count: Arc<AtomicU64>,
}

impl Syncable for CountingSyncable {
    fn sync(&self) -> Result<()> {
        self.inner.sync()?;
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Periodic strategy whose background flushes stay observable after close
struct ObservedPeriodic {
    inner: PeriodicSync,
    count: Arc<AtomicU64>,
}

impl SyncStrategy for ObservedPeriodic {
    fn name(&self) -> &'static str {
        "observed-periodic"
    }

    fn on_store_opened(&self, target: Arc<dyn Syncable>) -> Result<()> {
        self.inner.on_store_opened(Arc::new(CountingSyncable {
            inner: target,
            count: Arc::clone(&self.count),
        }))
    }

    fn on_store_closed(&self, target: &dyn Syncable) -> Result<()> {
        self.inner.on_store_closed(target)
    }
}

// =============================================================================
// Policy Conformance Tests
// =============================================================================

#[test]
fn test_header_flushed_at_creation() {
    let temp = TempDir::new().unwrap();
    let store = Store::<i64>::create("created", config_with(&temp, SyncPolicy::None)).unwrap();
    assert_eq!(store.sync_count(), 1);
}

#[test]
fn test_each_update_flushes_every_write() {
    let temp = TempDir::new().unwrap();
    let store = Store::<i64>::create("each", config_with(&temp, SyncPolicy::EachUpdate)).unwrap();

    let base = store.sync_count();
    for i in 1..=5u64 {
        store.set(&format!("key{}", i), i as i64).unwrap();
        assert_eq!(store.sync_count(), base + i);
    }
    store.delete("key1").unwrap();
    assert_eq!(store.sync_count(), base + 6);
}

#[test]
fn test_no_sync_never_flushes_on_write() {
    let temp = TempDir::new().unwrap();
    let store = Store::<i64>::create("none", config_with(&temp, SyncPolicy::None)).unwrap();

    let base = store.sync_count();
    for i in 0..20 {
        store.set(&format!("key{}", i), i).unwrap();
    }
    store.delete("key0").unwrap();
    store.transaction(|tx| tx.set("tx", 1)).unwrap();
    assert_eq!(store.sync_count(), base);
}

#[test]
fn test_explicit_flush_always_counts() {
    let temp = TempDir::new().unwrap();
    let store = Store::<i64>::create("explicit", config_with(&temp, SyncPolicy::None)).unwrap();

    let base = store.sync_count();
    store.set("key", 1).unwrap();
    store.flush().unwrap();
    assert_eq!(store.sync_count(), base + 1);
}

#[test]
fn test_on_transaction_flushes_per_commit() {
    let temp = TempDir::new().unwrap();
    let store =
        Store::<i64>::create("on_tx", config_with(&temp, SyncPolicy::OnTransaction)).unwrap();

    let base = store.sync_count();
    store.set("plain", 1).unwrap();
    assert_eq!(store.sync_count(), base);

    store
        .transaction(|tx| {
            tx.set("a", 1)?;
            tx.set("b", 2)?;
            tx.delete("plain");
            Ok(())
        })
        .unwrap();
    assert_eq!(store.sync_count(), base + 1);
}

#[test]
fn test_aborted_transaction_does_not_flush() {
    let temp = TempDir::new().unwrap();
    let store =
        Store::<i64>::create("on_tx_abort", config_with(&temp, SyncPolicy::OnTransaction)).unwrap();

    let mut tx = store.begin();
    tx.set("a", 1).unwrap();
    store.set("direct", 2).unwrap();

    let base = store.sync_count();
    assert!(tx.commit().is_err());
    assert_eq!(store.sync_count(), base);
}

#[test]
fn test_periodic_flushes_within_one_interval() {
    let temp = TempDir::new().unwrap();
    let interval = Duration::from_millis(50);
    let count = Arc::new(AtomicU64::new(0));
    let strategy = ObservedPeriodic {
        inner: PeriodicSync::new(interval),
        count: Arc::clone(&count),
    };

    // Only background flushes reach `count`; the creation flush does not
    let store = Store::<i64>::create_with_strategy(
        "periodic",
        config_with(&temp, SyncPolicy::None),
        Box::new(strategy),
    )
    .unwrap();
    store.set("key", 1).unwrap();

    thread::sleep(interval + Duration::from_millis(100));
    let ticked = count.load(Ordering::SeqCst);
    assert!(ticked >= 1);

    store.close().unwrap();
    assert!(count.load(Ordering::SeqCst) > ticked);
}

#[test]
fn test_periodic_policy_flushes_region() {
    let temp = TempDir::new().unwrap();
    let interval = Duration::from_millis(50);
    let config = config_with(&temp, SyncPolicy::Periodic { interval });
    let store = Store::<i64>::create("periodic_policy", config).unwrap();

    let created = store.sync_count();
    thread::sleep(interval + Duration::from_millis(100));
    assert!(store.sync_count() > created);

    store.close().unwrap();
}

#[test]
fn test_periodic_final_flush_on_close() {
    let temp = TempDir::new().unwrap();
    let count = Arc::new(AtomicU64::new(0));
    let strategy = ObservedPeriodic {
        // No tick fires during the test
        inner: PeriodicSync::new(Duration::from_secs(3600)),
        count: Arc::clone(&count),
    };

    let store = Store::<i64>::create_with_strategy(
        "periodic_close",
        config_with(&temp, SyncPolicy::None),
        Box::new(strategy),
    )
    .unwrap();

    store.set("key", 1).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    store.close().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_without_close_stops_periodic() {
    let temp = TempDir::new().unwrap();
    let count = Arc::new(AtomicU64::new(0));
    let strategy = ObservedPeriodic {
        inner: PeriodicSync::new(Duration::from_secs(3600)),
        count: Arc::clone(&count),
    };

    let store = Store::<i64>::create_with_strategy(
        "periodic_drop",
        config_with(&temp, SyncPolicy::None),
        Box::new(strategy),
    )
    .unwrap();
    drop(store);

    assert_eq!(count.load(Ordering::SeqCst), 1);
}
