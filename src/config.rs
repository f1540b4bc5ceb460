//! Configuration for mmapkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::ValueKind;
use crate::error::{KvError, Result};
use crate::region::HEADER_SIZE;
use crate::sync::{NoSync, PeriodicSync, SyncOnEachUpdate, SyncOnTransaction, SyncStrategy};

/// Default log region capacity (1 GiB)
pub const DEFAULT_CAPACITY: usize = 1 << 30;

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the backing files.
    /// A store named `foo` lives at `{data_dir}/foo.{file_extension}`
    pub data_dir: PathBuf,

    /// Extension appended to the store name
    pub file_extension: String,

    /// Fixed size of the log region in bytes (the file is truncated to this)
    pub capacity: usize,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When mapped writes are flushed to the backing file
    pub sync_policy: SyncPolicy,

    // -------------------------------------------------------------------------
    // Value Configuration
    // -------------------------------------------------------------------------
    /// Declared value kind. Required for `Store<Value>`, ignored otherwise
    pub value_kind: Option<ValueKind>,
}

/// Durability policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Never flush explicitly; rely on the OS page cache
    None,

    /// Flush after every write (safest, slowest)
    EachUpdate,

    /// Flush when a transaction commits and on close
    OnTransaction,

    /// Flush from a background thread every `interval`
    Periodic { interval: Duration },
}

impl SyncPolicy {
    /// Build the strategy object for this policy
    pub fn into_strategy(self) -> Box<dyn SyncStrategy> {
        match self {
            SyncPolicy::None => Box::new(NoSync),
            SyncPolicy::EachUpdate => Box::new(SyncOnEachUpdate),
            SyncPolicy::OnTransaction => Box::new(SyncOnTransaction),
            SyncPolicy::Periodic { interval } => Box::new(PeriodicSync::new(interval)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir(),
            file_extension: "db.bin".to_string(),
            capacity: DEFAULT_CAPACITY,
            sync_policy: SyncPolicy::EachUpdate,
            value_kind: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the backing file for the store called `name`
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", name, self.file_extension))
    }

    /// Check the settings a store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity <= HEADER_SIZE {
            return Err(KvError::Config(format!(
                "capacity {} must exceed the header size {}",
                self.capacity, HEADER_SIZE
            )));
        }
        if self.capacity > u32::MAX as usize {
            return Err(KvError::Config(format!(
                "capacity {} does not fit a 32-bit cursor",
                self.capacity
            )));
        }
        if let SyncPolicy::Periodic { interval } = self.sync_policy {
            if interval.is_zero() {
                return Err(KvError::Config(
                    "periodic sync interval must be non-zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the backing file extension
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.file_extension = ext.into();
        self
    }

    /// Set the log region capacity (in bytes)
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.config.capacity = bytes;
        self
    }

    /// Set the sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Declare the value kind for a dynamically typed store
    pub fn value_kind(mut self, kind: ValueKind) -> Self {
        self.config.value_kind = Some(kind);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
