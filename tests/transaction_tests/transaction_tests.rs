//! Tests for Transaction
//!
//! These tests verify:
//! - Buffered reads see buffered writes before commit
//! - Nothing reaches the store until commit
//! - Commit applies every buffered operation in order
//! - Any intervening write aborts the commit with no partial effects
//! - Closure-style transactions commit on Ok and discard on Err

use std::sync::{Arc, Barrier};
use std::thread;

use mmapkv::config::{Config, SyncPolicy};
use mmapkv::{KvError, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(name: &str) -> (TempDir, Store<i64>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .capacity(1024 * 1024)
        .sync_policy(SyncPolicy::None)
        .build();
    let store = Store::<i64>::create(name, config).unwrap();
    (temp_dir, store)
}

// =============================================================================
// Buffering Tests
// =============================================================================

#[test]
fn test_get_sees_buffered_set() {
    let (_temp, store) = setup_temp_store("buffered_set");

    let mut tx = store.begin();
    tx.set("key", 10).unwrap();

    assert_eq!(tx.get("key").unwrap(), 10);
    assert!(matches!(store.get("key"), Err(KvError::KeyNotFound(_))));
}

#[test]
fn test_get_falls_through_to_store() {
    let (_temp, store) = setup_temp_store("fall_through");
    store.set("existing", 5).unwrap();

    let tx = store.begin();
    assert_eq!(tx.get("existing").unwrap(), 5);
    assert!(matches!(tx.get("missing"), Err(KvError::KeyNotFound(_))));
}

#[test]
fn test_buffered_delete_reads_as_not_found() {
    let (_temp, store) = setup_temp_store("buffered_delete");
    store.set("key", 1).unwrap();

    let mut tx = store.begin();
    tx.delete("key");

    assert!(matches!(tx.get("key"), Err(KvError::KeyNotFound(_))));
    assert_eq!(store.get("key").unwrap(), 1);
}

#[test]
fn test_store_untouched_before_commit() {
    let (_temp, store) = setup_temp_store("untouched");
    let cursor = store.last_offset();

    let mut tx = store.begin();
    tx.set("a", 1).unwrap();
    tx.set("b", 2).unwrap();
    tx.delete("c");

    assert_eq!(store.last_offset(), cursor);
    assert_eq!(tx.len(), 3);
    assert_eq!(tx.start_offset(), cursor);
}

#[test]
fn test_rebuffering_key_keeps_latest() {
    let (_temp, store) = setup_temp_store("rebuffer");

    let mut tx = store.begin();
    tx.set("key", 1).unwrap();
    tx.delete("key");
    tx.set("key", 3).unwrap();

    assert_eq!(tx.len(), 1);
    assert_eq!(tx.get("key").unwrap(), 3);
    tx.commit().unwrap();
    assert_eq!(store.get("key").unwrap(), 3);
}

// =============================================================================
// Commit Tests
// =============================================================================

#[test]
fn test_commit_applies_sets_and_deletes() {
    let (_temp, store) = setup_temp_store("commit");
    store.set("doomed", 99).unwrap();

    let mut tx = store.begin();
    tx.set("a", 1).unwrap();
    tx.set("b", 2).unwrap();
    tx.delete("doomed");
    tx.commit().unwrap();

    assert_eq!(store.get("a").unwrap(), 1);
    assert_eq!(store.get("b").unwrap(), 2);
    assert!(matches!(store.get("doomed"), Err(KvError::KeyDeleted(_))));
}

#[test]
fn test_empty_commit() {
    let (_temp, store) = setup_temp_store("empty_commit");
    let cursor = store.last_offset();

    store.begin().commit().unwrap();
    assert_eq!(store.last_offset(), cursor);
}

#[test]
fn test_sequential_transactions_commit() {
    let (_temp, store) = setup_temp_store("sequential");

    for i in 0..5 {
        let mut tx = store.begin();
        tx.set("counter", i).unwrap();
        tx.commit().unwrap();
    }
    assert_eq!(store.get("counter").unwrap(), 4);
}

// =============================================================================
// Conflict Tests
// =============================================================================

#[test]
fn test_intervening_write_aborts_commit() {
    let (_temp, store) = setup_temp_store("conflict");

    let mut tx = store.begin();
    tx.set("tx_key1", 1).unwrap();
    tx.set("tx_key2", 2).unwrap();

    store.set("direct", 100).unwrap();
    let cursor = store.last_offset();

    let err = tx.commit().unwrap_err();
    assert!(matches!(err, KvError::ConcurrentModification { .. }));

    assert_eq!(store.last_offset(), cursor);
    assert!(matches!(store.get("tx_key1"), Err(KvError::KeyNotFound(_))));
    assert!(matches!(store.get("tx_key2"), Err(KvError::KeyNotFound(_))));
    assert_eq!(store.get("direct").unwrap(), 100);
}

#[test]
fn test_disjoint_keys_still_conflict() {
    let (_temp, store) = setup_temp_store("disjoint");

    let mut first = store.begin();
    let mut second = store.begin();
    first.set("left", 1).unwrap();
    second.set("right", 2).unwrap();

    first.commit().unwrap();
    assert!(matches!(
        second.commit(),
        Err(KvError::ConcurrentModification { .. })
    ));
    assert!(matches!(store.get("right"), Err(KvError::KeyNotFound(_))));
}

#[test]
fn test_intervening_delete_aborts_commit() {
    let (_temp, store) = setup_temp_store("conflict_delete");
    store.set("key", 1).unwrap();

    let mut tx = store.begin();
    tx.set("key", 2).unwrap();
    store.delete("other").unwrap();

    assert!(tx.commit().is_err());
    assert_eq!(store.get("key").unwrap(), 1);
}

#[test]
fn test_conflict_from_another_thread() {
    let (_temp, store) = setup_temp_store("conflict_thread");
    let store = Arc::new(store);
    let started = Arc::new(Barrier::new(2));
    let written = Arc::new(Barrier::new(2));

    let writer = {
        let store = Arc::clone(&store);
        let started = Arc::clone(&started);
        let written = Arc::clone(&written);
        thread::spawn(move || {
            started.wait();
            store.set("from_thread", 7).unwrap();
            written.wait();
        })
    };

    let mut tx = store.begin();
    tx.set("from_tx", 1).unwrap();
    started.wait();
    written.wait();

    assert!(matches!(
        tx.commit(),
        Err(KvError::ConcurrentModification { .. })
    ));
    writer.join().unwrap();

    assert_eq!(store.get("from_thread").unwrap(), 7);
    assert!(matches!(store.get("from_tx"), Err(KvError::KeyNotFound(_))));
}

#[test]
fn test_capacity_failure_is_all_or_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .capacity(48)
        .sync_policy(SyncPolicy::None)
        .build();
    let store = Store::<i64>::create("tx_tiny", config).unwrap();

    // 6 + 3 * 14 = 48 fits exactly; a fourth record does not
    let mut tx = store.begin();
    for i in 0..4 {
        tx.set(&format!("k{}", i), i).unwrap();
    }
    let err = tx.commit().unwrap_err();
    assert!(matches!(err, KvError::CapacityExceeded { .. }));
    assert_eq!(store.last_offset(), 6);
    assert!(matches!(store.get("k0"), Err(KvError::KeyNotFound(_))));
}

// =============================================================================
// Closure API Tests
// =============================================================================

#[test]
fn test_transaction_closure_commits() {
    let (_temp, store) = setup_temp_store("closure_commit");
    store.set("balance", 100).unwrap();

    store
        .transaction(|tx| {
            let balance = tx.get("balance")?;
            tx.set("balance", balance - 30)?;
            tx.set("spent", 30)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(store.get("balance").unwrap(), 70);
    assert_eq!(store.get("spent").unwrap(), 30);
}

#[test]
fn test_transaction_closure_error_discards() {
    let (_temp, store) = setup_temp_store("closure_error");

    let result = store.transaction(|tx| {
        tx.set("partial", 1)?;
        tx.get("missing")?;
        Ok(())
    });

    assert!(matches!(result, Err(KvError::KeyNotFound(_))));
    assert!(matches!(store.get("partial"), Err(KvError::KeyNotFound(_))));
}
