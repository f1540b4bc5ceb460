//! Periodic sync
//!
//! Flushes from a background thread on a fixed interval.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{KvError, Result};

use super::{SyncStrategy, Syncable};

/// Flushes every `interval` until the store closes
///
/// The worker holds its own handle on the target, so it never takes the
/// store lock. Closing sends a cancel message; the worker does one final
/// flush and exits before `on_store_closed` returns.
pub struct PeriodicSync {
    interval: Duration,
    worker: Mutex<Option<Worker>>,
}

/// A running background flusher
struct Worker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicSync {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the background thread is running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    fn stop(&self) -> Result<()> {
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };

        // The worker may already be gone if it aborted; a failed send is fine
        let _ = worker.cancel.send(());
        worker.handle.join().map_err(|_| {
            KvError::Sync(io::Error::new(
                io::ErrorKind::Other,
                "periodic sync thread panicked",
            ))
        })
    }
}

impl SyncStrategy for PeriodicSync {
    fn name(&self) -> &'static str {
        "periodic"
    }

    fn on_store_opened(&self, target: Arc<dyn Syncable>) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(KvError::Config(
                "periodic sync is already attached to a store".to_string(),
            ));
        }

        let (cancel, cancelled) = channel::bounded(1);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("mmapkv-sync".to_string())
            .spawn(move || run_periodic(interval, target, cancelled))?;

        *worker = Some(Worker { cancel, handle });
        Ok(())
    }

    fn on_store_closed(&self, _target: &dyn Syncable) -> Result<()> {
        self.stop()
    }
}

impl Drop for PeriodicSync {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "Periodic sync did not stop cleanly");
        }
    }
}

/// Worker loop: flush on every tick, flush once more on cancel
fn run_periodic(interval: Duration, target: Arc<dyn Syncable>, cancelled: Receiver<()>) {
    tracing::debug!(?interval, "Starting periodic data sync");
    let ticker = channel::tick(interval);

    loop {
        crossbeam::select! {
            recv(cancelled) -> _ => {
                tracing::debug!("Periodic data sync cancelled, performing final sync");
                flush_or_abort(&*target);
                break;
            }
            recv(ticker) -> _ => {
                tracing::trace!("msync");
                flush_or_abort(&*target);
            }
        }
    }

    tracing::debug!(?interval, "Stopping periodic data sync");
}

/// No caller can observe a background failure, so durability loss is fatal
fn flush_or_abort(target: &dyn Syncable) {
    if let Err(e) = target.sync() {
        tracing::error!(error = %e, "Background flush failed, aborting");
        std::process::abort();
    }
}
