//! Store Module
//!
//! The storage engine that coordinates the log region, header, offset index
//! and sync strategy.
//!
//! ## Responsibilities
//! - Append records for `set`/`delete` and advance the header cursor
//! - Resolve `get` through the offset index
//! - Notify the sync strategy of lifecycle events
//! - Apply committed transactions atomically against concurrent writers

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{
    encode_record, encode_value, EncodedRecord, StoreValue, ValueKind, LEN_FIELD_SIZE,
};
use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::OffsetIndex;
use crate::region::{page_size, remove_partial, Header, LogRegion, RegionFlusher};
use crate::sync::{SyncStrategy, Syncable};
use crate::transaction::Transaction;

/// An embedded key-value store over a memory-mapped log
///
/// ## Concurrency Model: one exclusive lock
///
/// - `set`, `get`, `delete` and transaction commits all take `state`
/// - Foreground flushes (each-update, on-transaction) run inside that lock
/// - `flush` and the periodic worker go through a [`RegionFlusher`] and never
///   take the lock
///
/// `close` and `destroy` consume the store. Dropping an open store runs the
/// close path and logs any failure.
pub struct Store<T: StoreValue> {
    /// Store name (file stem of the backing file)
    name: String,

    /// Backing file path
    path: PathBuf,

    /// Store configuration
    config: Config,

    /// Declared value kind, fixed at creation
    value_kind: ValueKind,

    /// Header, region and index behind the store lock
    state: Mutex<StoreState>,

    /// Durability policy
    strategy: Box<dyn SyncStrategy>,

    /// Lock-free flush handle onto the region
    flusher: RegionFlusher,

    /// Set once the close path has run
    closed: bool,

    _marker: PhantomData<fn() -> T>,
}

/// Everything guarded by the store lock
struct StoreState {
    header: Header,
    region: LogRegion,
    index: OffsetIndex,
}

impl StoreState {
    /// Append one record at the cursor, then advance the header and index
    ///
    /// The record bytes land before the header moves, so a crash mid-copy
    /// leaves the header pointing before the partial record.
    fn append(&mut self, key: &str, record: &EncodedRecord) -> Result<()> {
        let start = self.header.last_offset as usize;
        let end = start as u64 + record.len() as u64;
        let capacity = self.region.capacity() as u64;
        if end > capacity {
            return Err(KvError::CapacityExceeded {
                required: end,
                capacity,
            });
        }

        self.region.write(start, &record.bytes)?;

        self.header.last_offset = end as u32;
        self.region.write_header(&self.header)?;

        self.index.insert(key, (start + record.value_len_offset) as u32);

        tracing::trace!(
            key,
            offset = start,
            len = record.len(),
            tombstone = record.is_tombstone(),
            "Appended record"
        );
        Ok(())
    }

    /// Payload of `key`'s newest record; `None` for a tombstone
    fn payload(&self, key: &str) -> Result<Option<&[u8]>> {
        let offset = self
            .index
            .get(key)
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))? as usize;

        let len_field = self.region.read(offset, LEN_FIELD_SIZE)?;
        let len = u16::from_le_bytes([len_field[0], len_field[1]]) as usize;
        if len == 0 {
            return Ok(None);
        }

        self.region.read(offset + LEN_FIELD_SIZE, len).map(Some)
    }
}

impl<T: StoreValue> Store<T> {
    /// Create a new store named `name`, using the configured sync policy
    ///
    /// The backing file is created exclusively: creating over an existing
    /// store fails with [`KvError::Creation`].
    pub fn create(name: &str, config: Config) -> Result<Self> {
        let strategy = config.sync_policy.into_strategy();
        Self::create_with_strategy(name, config, strategy)
    }

    /// Create a new store with a caller-supplied sync strategy
    ///
    /// On creation:
    /// 1. Validate config and resolve the declared value kind
    /// 2. Create, size and map the backing file
    /// 3. Write and flush the header
    /// 4. Notify the sync strategy
    ///
    /// If step 3 or 4 fails the new file is removed, so the name stays free.
    pub fn create_with_strategy(
        name: &str,
        config: Config,
        strategy: Box<dyn SyncStrategy>,
    ) -> Result<Self> {
        // Step 1: Validate
        config.validate()?;
        let value_kind = Self::resolve_kind(&config)?;

        // Step 2: Map the log region
        let path = config.store_path(name);
        let mut region = LogRegion::create(&path, config.capacity)?;

        // Steps 3 and 4: Header, then the durability policy
        let header = Header::new(value_kind);
        let flusher = match Self::initialize(&mut region, &header, strategy.as_ref()) {
            Ok(flusher) => flusher,
            Err(e) => {
                drop(region);
                remove_partial(&path);
                return Err(e);
            }
        };

        tracing::info!(
            store = name,
            path = %path.display(),
            capacity = config.capacity,
            page_size = page_size(),
            kind = %value_kind,
            sync = strategy.name(),
            "Store created"
        );

        Ok(Self {
            name: name.to_string(),
            path,
            config,
            value_kind,
            state: Mutex::new(StoreState {
                header,
                region,
                index: OffsetIndex::new(),
            }),
            strategy,
            flusher,
            closed: false,
            _marker: PhantomData,
        })
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set(&self, key: &str, value: T) -> Result<()> {
        let record = self.encode_set(key, &value)?;

        let mut state = self.state.lock();
        state.append(key, &record)?;
        self.strategy.on_write_completed(&self.flusher)
    }

    /// Get the newest value for `key`
    ///
    /// Returns:
    /// - `Err(KeyNotFound)`: the key was never written
    /// - `Err(KeyDeleted)`: the newest record is a tombstone
    /// - `Err(Decode)`: the payload does not fit `T`
    pub fn get(&self, key: &str) -> Result<T> {
        let state = self.state.lock();
        match state.payload(key)? {
            Some(payload) => T::decode(state.header.value_kind, payload),
            None => Err(KvError::KeyDeleted(key.to_string())),
        }
    }

    /// Append a tombstone for `key`
    ///
    /// Deleting a key that was never written still records the tombstone.
    pub fn delete(&self, key: &str) -> Result<()> {
        let record = encode_record(key, None)?;

        let mut state = self.state.lock();
        state.append(key, &record)?;
        self.strategy.on_write_completed(&self.flusher)
    }

    /// Whether `key` currently has a live value
    pub fn contains(&self, key: &str) -> Result<bool> {
        let state = self.state.lock();
        match state.payload(key) {
            Ok(payload) => Ok(payload.is_some()),
            Err(KvError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Flush the mapped region to the backing file now
    ///
    /// Does not take the store lock.
    pub fn flush(&self) -> Result<()> {
        self.flusher.sync()
    }

    /// Start a buffered transaction against this store
    pub fn begin(&self) -> Transaction<'_, T> {
        let start_offset = self.state.lock().header.last_offset;
        Transaction::new(self, start_offset)
    }

    /// Run `f` inside a transaction
    ///
    /// Commits when `f` returns `Ok`, discards the buffer otherwise.
    pub fn transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Transaction<'_, T>) -> Result<()>,
    {
        let mut tx = self.begin();
        match f(&mut tx) {
            Ok(()) => tx.commit(),
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    /// Close the store: let the sync strategy finish, then unmap
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    /// Close the store, delete its backing file and clear in-memory state
    pub fn destroy(mut self) -> Result<()> {
        self.shutdown()?;

        {
            let mut state = self.state.lock();
            state.index.clear();
            state.header.last_offset = 0;
        }

        fs::remove_file(&self.path)?;
        tracing::info!(store = %self.name, "Store destroyed");
        Ok(())
    }

    // =========================================================================
    // Crate-internal API (used by Transaction)
    // =========================================================================

    /// Reject values whose kind differs from the declared one
    pub(crate) fn check_kind(&self, value: &T) -> Result<()> {
        let found = value.kind();
        if found != self.value_kind {
            return Err(KvError::UnsupportedType {
                expected: self.value_kind,
                found,
            });
        }
        Ok(())
    }

    /// Apply a transaction buffer if the cursor has not moved since
    /// `start_offset`
    ///
    /// The whole batch is encoded and checked against capacity before the
    /// first append, so a failure leaves the store untouched.
    pub(crate) fn commit_batch(
        &self,
        start_offset: u32,
        ops: &[(String, Option<T>)],
    ) -> Result<()> {
        let records = ops
            .iter()
            .map(|(key, value)| match value {
                Some(value) => self.encode_set(key, value),
                None => encode_record(key, None),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.state.lock();

        let current = state.header.last_offset;
        if current != start_offset {
            tracing::warn!(
                store = %self.name,
                expected = start_offset,
                actual = current,
                "Transaction aborted by concurrent write"
            );
            return Err(KvError::ConcurrentModification {
                expected: start_offset,
                actual: current,
            });
        }

        if records.is_empty() {
            return Ok(());
        }

        let batch_len: u64 = records.iter().map(|r| r.len() as u64).sum();
        let capacity = state.region.capacity() as u64;
        if current as u64 + batch_len > capacity {
            return Err(KvError::CapacityExceeded {
                required: current as u64 + batch_len,
                capacity,
            });
        }

        for ((key, _), record) in ops.iter().zip(&records) {
            state.append(key, record)?;
            self.strategy.on_write_completed(&self.flusher)?;
        }
        self.strategy.on_transaction_committed(&self.flusher)?;

        tracing::debug!(
            store = %self.name,
            operations = records.len(),
            bytes = batch_len,
            "Transaction committed"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the declared value kind
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Get a copy of the current header
    pub fn header(&self) -> Header {
        self.state.lock().header
    }

    /// Get the write cursor
    pub fn last_offset(&self) -> u32 {
        self.state.lock().header.last_offset
    }

    /// Get the number of distinct keys written (tombstoned keys included)
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    /// Whether no key has been written yet
    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    /// Get the log region capacity in bytes
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Get the number of completed region flushes
    pub fn sync_count(&self) -> u64 {
        self.flusher.flush_count()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn resolve_kind(config: &Config) -> Result<ValueKind> {
        match (T::DECLARED_KIND, config.value_kind) {
            (Some(kind), Some(configured)) if kind != configured => Err(KvError::Config(format!(
                "configured value kind {} conflicts with the store's {}",
                configured, kind
            ))),
            (Some(kind), _) | (None, Some(kind)) => Ok(kind),
            (None, None) => Err(KvError::Config(
                "a dynamically typed store needs a declared value kind".to_string(),
            )),
        }
    }

    fn initialize(
        region: &mut LogRegion,
        header: &Header,
        strategy: &dyn SyncStrategy,
    ) -> Result<RegionFlusher> {
        region.write_header(header)?;
        region.flush()?;

        let flusher = region.flusher();
        strategy.on_store_opened(Arc::new(flusher.clone()))?;
        Ok(flusher)
    }

    fn encode_set(&self, key: &str, value: &T) -> Result<EncodedRecord> {
        self.check_kind(value)?;
        let payload = encode_value(value)?;
        encode_record(key, Some(&payload))
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.strategy.on_store_closed(&self.flusher);
        tracing::info!(store = %self.name, "Store closed");
        result
    }
}

impl<T: StoreValue> Drop for Store<T> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(store = %self.name, error = %e, "Store close failed during drop");
        }
    }
}

/// Remove the backing file of the store called `name`
///
/// Fails with [`KvError::Io`] if the file does not exist or cannot be removed.
pub fn drop_store(name: &str, config: &Config) -> Result<()> {
    let path = config.store_path(name);
    fs::remove_file(&path)?;
    tracing::info!(store = name, path = %path.display(), "Store file removed");
    Ok(())
}
