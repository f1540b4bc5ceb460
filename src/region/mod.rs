//! Log Region Module
//!
//! The memory-mapped, fixed-capacity byte region backing a store.
//!
//! ## Responsibilities
//! - Create, size and map the backing file
//! - Bounds-checked reads and writes addressed by offset
//! - Flush mapped pages back to the file
//!
//! ## Layout
//! ```text
//! ┌────────────┬──────────┬──────────┬─────┬───────────────────────┐
//! │ Header (6) │ Record 1 │ Record 2 │ ... │ free (up to capacity) │
//! └────────────┴──────────┴──────────┴─────┴───────────────────────┘
//!                                          ^ header.last_offset
//! ```

mod header;

pub use header::{Header, FORMAT_VERSION, HEADER_SIZE};

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use memmap2::{MmapOptions, MmapRaw};

use crate::error::{KvError, Result};
use crate::sync::Syncable;

/// A mapped log file of fixed capacity
///
/// ## Access rules
/// - Writes need `&mut self`; the store only hands that out under its lock
/// - [`RegionFlusher`] handles may flush concurrently, since flushing never
///   changes mapped bytes
pub struct LogRegion {
    /// The mapping, shared with flusher handles
    map: Arc<MmapRaw>,

    /// Completed flushes, shared with flusher handles
    flushes: Arc<AtomicU64>,
}

impl LogRegion {
    /// Create the backing file exclusively, size it, and map it
    ///
    /// A file this call created is removed again if sizing or mapping fails.
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        let creation = |source: std::io::Error| KvError::Creation {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(creation)?;

        let mapped = file
            .set_len(capacity as u64)
            .and_then(|()| MmapOptions::new().len(capacity).map_raw(&file));

        // The mapping stays valid after the descriptor is closed
        drop(file);

        let map = match mapped {
            Ok(map) => map,
            Err(source) => {
                remove_partial(path);
                return Err(creation(source));
            }
        };

        Ok(Self {
            map: Arc::new(map),
            flushes: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Copy `bytes` into the region at `offset`
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check_bounds(offset, bytes.len())?;

        // SAFETY: the range was bounds-checked above, `&mut self` guarantees no
        // other reader or writer in this process, and flushers never touch the
        // mapped contents.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.map.as_mut_ptr().add(offset),
                bytes.len(),
            );
        }
        Ok(())
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check_bounds(offset, len).map_err(|_| {
            KvError::Decode(format!("range {}+{} lies outside the region", offset, len))
        })?;

        // SAFETY: bounds-checked; writes need `&mut self`, so none can overlap
        // this shared borrow.
        Ok(unsafe { std::slice::from_raw_parts(self.map.as_ptr().add(offset), len) })
    }

    /// Serialize the header into the first bytes of the region
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        self.write(0, &header.to_bytes())
    }

    /// Read the header back from the region
    pub fn read_header(&self) -> Result<Header> {
        Header::from_bytes(self.read(0, HEADER_SIZE)?)
    }

    /// Synchronously flush the whole mapping to the backing file
    pub fn flush(&self) -> Result<()> {
        self.flusher().sync()
    }

    /// A handle that can flush this region from another thread
    pub fn flusher(&self) -> RegionFlusher {
        RegionFlusher {
            map: Arc::clone(&self.map),
            flushes: Arc::clone(&self.flushes),
        }
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.map.len()
    }

    /// Number of flushes completed so far
    pub fn flush_count(&self) -> u64 {
        self.flusher().flush_count()
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<()> {
        let end = offset as u64 + len as u64;
        if end > self.capacity() as u64 {
            return Err(KvError::CapacityExceeded {
                required: end,
                capacity: self.capacity() as u64,
            });
        }
        Ok(())
    }
}

/// Remove a backing file left behind by a creation that did not finish
pub(crate) fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Could not remove partially created store file"
        );
    }
}

/// Size of an OS memory page in bytes
#[cfg(unix)]
pub fn page_size() -> usize {
    // SAFETY: sysconf only reads a system constant
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

/// Size of an OS memory page in bytes
#[cfg(not(unix))]
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Cloneable flush handle for a [`LogRegion`]
///
/// Keeps the mapping alive until every handle is dropped.
#[derive(Clone)]
pub struct RegionFlusher {
    map: Arc<MmapRaw>,
    flushes: Arc<AtomicU64>,
}

impl RegionFlusher {
    /// Number of flushes completed through any handle on this region
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Syncable for RegionFlusher {
    fn sync(&self) -> Result<()> {
        self.map.flush().map_err(KvError::Sync)?;
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
