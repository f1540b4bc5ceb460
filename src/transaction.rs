//! Transaction Module
//!
//! Buffered, optimistic transactions over a [`Store`].
//!
//! ## Protocol
//! 1. `begin` snapshots the store cursor
//! 2. `set`/`delete` only touch the local buffer; `get` reads the buffer
//!    first and falls back to the store
//! 3. `commit` takes the store lock and applies the buffer in insertion
//!    order, but only if the cursor still equals the snapshot. Any write
//!    in between, to any key, aborts the whole transaction with
//!    `ConcurrentModification`

use std::collections::HashMap;

use crate::codec::StoreValue;
use crate::error::{KvError, Result};
use crate::store::Store;

/// A buffered set of writes committed all-or-nothing
///
/// Dropping a transaction without committing discards it.
pub struct Transaction<'a, T: StoreValue> {
    /// Store the buffer is applied to
    store: &'a Store<T>,

    /// Store cursor when the transaction began
    start_offset: u32,

    /// Buffered operations in first-touch order; `None` is a delete
    entries: Vec<(String, Option<T>)>,

    /// Key → slot in `entries`
    positions: HashMap<String, usize>,
}

impl<'a, T: StoreValue> Transaction<'a, T> {
    pub(crate) fn new(store: &'a Store<T>, start_offset: u32) -> Self {
        Self {
            store,
            start_offset,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Buffer a write of `value` under `key`
    ///
    /// Values of the wrong kind are rejected here rather than at commit.
    pub fn set(&mut self, key: &str, value: T) -> Result<()> {
        self.store.check_kind(&value)?;
        self.buffer(key, Some(value));
        Ok(())
    }

    /// Buffer a delete of `key`
    pub fn delete(&mut self, key: &str) {
        self.buffer(key, None);
    }

    /// Read `key`, preferring buffered writes over the store
    ///
    /// A buffered delete reads as `KeyNotFound`.
    pub fn get(&self, key: &str) -> Result<T> {
        match self.positions.get(key) {
            Some(&slot) => match &self.entries[slot].1 {
                Some(value) => Ok(value.clone()),
                None => Err(KvError::KeyNotFound(key.to_string())),
            },
            None => self.store.get(key),
        }
    }

    /// Apply the buffer to the store
    pub fn commit(self) -> Result<()> {
        self.store.commit_batch(self.start_offset, &self.entries)
    }

    /// Discard the buffer
    pub fn rollback(self) {
        tracing::debug!(
            store = self.store.name(),
            operations = self.entries.len(),
            "Transaction rolled back"
        );
    }

    /// Store cursor captured at `begin`
    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    /// Number of distinct keys buffered
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn buffer(&mut self, key: &str, value: Option<T>) {
        match self.positions.get(key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value));
            }
        }
    }
}
