//! mmapkv Demo Binary
//!
//! Drives a store through a short scripted session.

use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use mmapkv::{drop_store, Config, KvError, Store, SyncPolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// mmapkv demo
#[derive(Parser, Debug)]
#[command(name = "mmapkv-demo")]
#[command(about = "Exercise an mmap-backed key-value store")]
#[command(version)]
struct Args {
    /// Directory holding the store file
    #[arg(short, long, default_value_os_t = std::env::temp_dir())]
    data_dir: std::path::PathBuf,

    /// Store name
    #[arg(short, long, default_value = "mmapkv")]
    name: String,

    /// When to flush the mapped region
    #[arg(short, long, value_enum, default_value_t = SyncMode::EachUpdate)]
    sync: SyncMode,

    /// Interval for periodic sync, in milliseconds
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Log region capacity in MB
    #[arg(short, long, default_value = "1024")]
    capacity_mb: usize,

    /// Extra sequential keys to insert after the scripted session
    #[arg(long, default_value = "0")]
    bulk: u64,

    /// Keep the store file instead of deleting it on exit
    #[arg(long)]
    keep: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncMode {
    None,
    EachUpdate,
    Transaction,
    Periodic,
}

impl SyncMode {
    fn policy(self, interval: Duration) -> SyncPolicy {
        match self {
            SyncMode::None => SyncPolicy::None,
            SyncMode::EachUpdate => SyncPolicy::EachUpdate,
            SyncMode::Transaction => SyncPolicy::OnTransaction,
            SyncMode::Periodic => SyncPolicy::Periodic { interval },
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mmapkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("mmapkv demo v{}", mmapkv::VERSION);

    if let Err(e) = run(&args) {
        tracing::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> mmapkv::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .capacity(args.capacity_mb * 1024 * 1024)
        .sync_policy(args.sync.policy(Duration::from_millis(args.interval_ms)))
        .build();

    // Start from a clean file, like a fresh run
    match drop_store(&args.name, &config) {
        Ok(()) => tracing::info!("Removed stale store file"),
        Err(KvError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let store = Store::<i64>::create(&args.name, config)?;

    for (key, value) in [("key1", 1), ("key2", 2), ("key3", 3)] {
        store.set(key, value)?;
        tracing::info!("Set [{}={}]", key, value);
    }

    for key in ["key1", "key2", "key3"] {
        let value = store.get(key)?;
        tracing::info!("Get [{}={}]", key, value);
    }

    store.delete("key1")?;
    tracing::info!("Delete [key1]");

    match store.get("key1") {
        Ok(value) => tracing::warn!("Get [key1={}] after delete", value),
        Err(e) => tracing::info!("Get [key1] error: {}", e),
    }

    store.transaction(|tx| {
        let current = tx.get("key2")?;
        tx.set("key2", current + 10)?;
        tx.delete("key3");
        Ok(())
    })?;
    tracing::info!("Transaction committed, key2={}", store.get("key2")?);

    if args.bulk > 0 {
        let started = Instant::now();
        for i in 0..args.bulk {
            store.set(&format!("key{}", i), i as i64)?;
        }
        tracing::info!(
            "Inserted {} keys in {:?} (cursor at {} bytes)",
            args.bulk,
            started.elapsed(),
            store.last_offset()
        );
    }

    tracing::info!("Flushes performed: {}", store.sync_count());

    if args.keep {
        store.close()
    } else {
        store.destroy()
    }
}
