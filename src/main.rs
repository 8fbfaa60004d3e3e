//! nscache workload driver
//!
//! Wires a cache registry the way a service bootstrap would and runs a
//! synthetic read-through workload against it, then reports partition
//! statistics.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nscache::{Built, CachePartition, CacheRegistry, Config, TypedPartition};

/// Value cached by the workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Contact {
    id: u64,
    name: String,
    email: String,
}

/// Workload knobs, read from the environment.
#[derive(Debug, Clone)]
struct Workload {
    /// Concurrent worker tasks
    workers: u64,
    /// Operations per worker
    operations: u64,
    /// Distinct contact ids
    key_space: u64,
}

impl Workload {
    /// # Environment Variables
    /// - `WORKERS` - Worker tasks (default: 4)
    /// - `OPERATIONS` - Operations per worker (default: 10000)
    /// - `KEY_SPACE` - Distinct ids (default: 5000)
    fn from_env() -> Self {
        let read = |name: &str, default: u64| {
            env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            workers: read("WORKERS", 4),
            operations: read("OPERATIONS", 10_000),
            key_space: read("KEY_SPACE", 5_000),
        }
    }
}

/// Stand-in for the database behind the cache.
#[derive(Debug, Default)]
struct BackingStore {
    loads: AtomicU64,
}

impl BackingStore {
    /// Ids in the top tenth of the key space do not exist.
    async fn load(&self, id: u64, key_space: u64) -> anyhow::Result<Option<Contact>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_micros(200)).await;
        if id >= key_space - key_space / 10 {
            return Ok(None);
        }
        Ok(Some(Contact {
            id,
            name: format!("Contact {}", id),
            email: format!("contact{}@example.com", id),
        }))
    }
}

/// Main entry point for the workload driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the registry and register partitions
/// 4. Run worker tasks plus one scan task
/// 5. Log per-partition statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nscache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting nscache workload");

    let config = Config::from_env().context("failed to load cache configuration")?;
    let workload = Workload::from_env();
    info!(
        "Configuration loaded: cache_type={}, window={}%, protected={}%, workers={}, operations={}, key_space={}",
        config.cache_kind,
        config.window_percent,
        config.protected_percent,
        workload.workers,
        workload.operations,
        workload.key_space
    );

    let registry = CacheRegistry::from_config(&config);
    let contacts: TypedPartition<Option<Contact>> = TypedPartition::msgpack(registry.register(
        CachePartition::new("contacts", Duration::from_secs(30), 1000),
    )?);
    let store = Arc::new(BackingStore::default());

    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for worker in 0..workload.workers {
        tasks.spawn(run_worker(
            worker,
            workload.clone(),
            contacts.clone(),
            Arc::clone(&store),
        ));
    }
    tasks.spawn(run_scan(workload.clone(), contacts.clone(), Arc::clone(&store)));

    let finished = tokio::select! {
        result = join_all(&mut tasks) => Some(result),
        _ = signal::ctrl_c() => None,
    };
    match finished {
        Some(result) => result?,
        None => {
            warn!("Received Ctrl+C, aborting workload");
            tasks.abort_all();
        }
    }

    info!(
        "Workload finished in {:?}, backing store loads={}",
        started.elapsed(),
        store.loads.load(Ordering::Relaxed)
    );
    for (namespace, stats) in registry.stats() {
        info!(
            "Partition {} hit_rate={:.3} stats={}",
            namespace,
            stats.hit_rate(),
            serde_json::to_string(&stats)?
        );
    }

    Ok(())
}

async fn join_all(tasks: &mut JoinSet<anyhow::Result<()>>) -> anyhow::Result<()> {
    while let Some(result) = tasks.join_next().await {
        result.context("worker task panicked")??;
    }
    Ok(())
}

/// Skewed read-through traffic: 80% of reads go to the first 10% of ids.
/// One operation in twenty is a write that invalidates the cached entry.
async fn run_worker(
    worker: u64,
    workload: Workload,
    contacts: TypedPartition<Option<Contact>>,
    store: Arc<BackingStore>,
) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(worker);
    let hot = (workload.key_space / 10).max(1);

    for _ in 0..workload.operations {
        let id = if rng.gen_bool(0.8) {
            rng.gen_range(0..hot)
        } else {
            rng.gen_range(0..workload.key_space)
        };
        let raw_key = id.to_string();

        if rng.gen_ratio(1, 20) {
            contacts.delete(&raw_key)?;
            continue;
        }

        read_through(&contacts, &store, id, workload.key_space).await?;
    }
    Ok(())
}

/// A one-off pass over every id, the access pattern TinyLFU admission
/// keeps from flushing the hot set.
async fn run_scan(
    workload: Workload,
    contacts: TypedPartition<Option<Contact>>,
    store: Arc<BackingStore>,
) -> anyhow::Result<()> {
    for id in 0..workload.key_space {
        read_through(&contacts, &store, id, workload.key_space).await?;
    }
    Ok(())
}

async fn read_through(
    contacts: &TypedPartition<Option<Contact>>,
    store: &BackingStore,
    id: u64,
    key_space: u64,
) -> anyhow::Result<Option<Contact>> {
    contacts
        .get_or_build_async(&id.to_string(), || async move {
            // Missing contacts are not cached
            let built = match store.load(id, key_space).await? {
                Some(contact) => Built::cached(Some(contact)),
                None => Built::uncached(None),
            };
            Ok::<_, anyhow::Error>(built)
        })
        .await
}
