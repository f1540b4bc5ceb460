//! Sync Strategy Module
//!
//! Pluggable policies deciding when mapped writes reach the backing file.
//!
//! ## Hooks
//! | strategy            | write completed | tx committed | store opened    | store closed        |
//! |---------------------|-----------------|--------------|-----------------|---------------------|
//! | `NoSync`            | -               | -            | -               | -                   |
//! | `SyncOnEachUpdate`  | flush           | -            | -               | flush               |
//! | `SyncOnTransaction` | -               | flush        | -               | flush               |
//! | `PeriodicSync`      | -               | -            | start ticker    | cancel, final flush |
//!
//! A failed flush means durability is lost. Foreground hooks return
//! [`KvError::Sync`](crate::KvError::Sync) to the caller; the periodic
//! worker has no caller and aborts the process.

mod periodic;

pub use periodic::PeriodicSync;

use std::sync::Arc;

use crate::error::Result;

/// Something whose pending writes can be flushed to stable storage
pub trait Syncable: Send + Sync {
    /// Flush synchronously
    fn sync(&self) -> Result<()>;
}

/// Durability policy driven by store lifecycle events
pub trait SyncStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Called once after the store is created
    fn on_store_opened(&self, _target: Arc<dyn Syncable>) -> Result<()> {
        Ok(())
    }

    /// Called after each record lands in the region
    fn on_write_completed(&self, _target: &dyn Syncable) -> Result<()> {
        Ok(())
    }

    /// Called after a transaction's buffered operations are applied
    fn on_transaction_committed(&self, _target: &dyn Syncable) -> Result<()> {
        Ok(())
    }

    /// Called before the region is unmapped
    fn on_store_closed(&self, _target: &dyn Syncable) -> Result<()> {
        Ok(())
    }
}

/// Never flushes; durability is left to the OS page cache
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSync;

impl SyncStrategy for NoSync {
    fn name(&self) -> &'static str {
        "none"
    }
}

/// Flushes after every write and on close
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOnEachUpdate;

impl SyncStrategy for SyncOnEachUpdate {
    fn name(&self) -> &'static str {
        "each-update"
    }

    fn on_write_completed(&self, target: &dyn Syncable) -> Result<()> {
        target.sync()
    }

    fn on_store_closed(&self, target: &dyn Syncable) -> Result<()> {
        target.sync()
    }
}

/// Flushes when a transaction commits and on close
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOnTransaction;

impl SyncStrategy for SyncOnTransaction {
    fn name(&self) -> &'static str {
        "on-transaction"
    }

    fn on_transaction_committed(&self, target: &dyn Syncable) -> Result<()> {
        target.sync()
    }

    fn on_store_closed(&self, target: &dyn Syncable) -> Result<()> {
        target.sync()
    }
}
