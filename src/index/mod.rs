//! Offset Index Module
//!
//! In-memory map from key to the offset of its newest value-length field.
//!
//! ## Responsibilities
//! - O(1) lookup of a key's latest record
//! - Overwrite on re-insert so stale records become unreachable
//!
//! Entries are never removed individually: a deleted key points at its
//! tombstone record. The whole index is discarded with the store.

use std::collections::HashMap;

/// Key → value-length offset map
#[derive(Debug, Default)]
pub struct OffsetIndex {
    entries: HashMap<String, u32>,
}

impl OffsetIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newest offset for `key`, returning the previous one
    pub fn insert(&mut self, key: &str, offset: u32) -> Option<u32> {
        match self.entries.get_mut(key) {
            Some(slot) => Some(std::mem::replace(slot, offset)),
            None => {
                self.entries.insert(key.to_string(), offset);
                None
            }
        }
    }

    /// Offset of the value-length field of `key`'s newest record
    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).copied()
    }

    /// Number of distinct keys ever written (tombstoned keys included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
