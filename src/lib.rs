//! # mmapkv
//!
//! An embedded key-value store backed by a memory-mapped append-only log:
//! - Typed `set`/`get`/`delete` over string keys
//! - O(1) lookups through an in-memory offset index
//! - Pluggable durability policy (sync strategies)
//! - Optimistic, buffered transactions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Transaction (buffer + cursor)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ commit
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Store (one Mutex)                        │
//! └──────┬──────────────┬───────────────┬───────────────┬───────┘
//!        │              │               │               │
//!        ▼              ▼               ▼               ▼
//!   ┌─────────┐   ┌───────────┐   ┌───────────┐   ┌────────────┐
//!   │  Codec  │   │  Header   │   │  Offset   │   │    Sync    │
//!   │         │   │           │   │   Index   │   │  Strategy  │
//!   └─────────┘   └─────┬─────┘   └───────────┘   └─────┬──────┘
//!                       │                               │ flush
//!                       ▼                               ▼
//!                ┌──────────────────────────────────────────┐
//!                │        Log Region (mmap, fixed size)      │
//!                └──────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mmapkv::{Config, Store};
//!
//! let store = Store::<i64>::create("numbers", Config::default())?;
//! store.set("answer", 42)?;
//! assert_eq!(store.get("answer")?, 42);
//! store.destroy()?;
//! # Ok::<(), mmapkv::KvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod region;
pub mod index;
pub mod sync;
pub mod store;
pub mod transaction;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, SyncPolicy};
pub use codec::{StoreValue, Value, ValueKind};
pub use store::{drop_store, Store};
pub use transaction::Transaction;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mmapkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
