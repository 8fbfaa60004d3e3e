//! Partition Registry Module
//!
//! Maps namespaces to isolated cache partitions. Each partition owns its own
//! TinyLFU policy, sketch and lock; nothing is shared between partitions
//! apart from the registry map itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStats, Clock, PolicyTuning, SystemClock, TinyLfu};
use crate::config::{CacheKind, Config};
use crate::error::{CacheError, Result};

/// Largest `max_items` a partition may declare. Matches the widest
/// frequency sketch, so every partition gets one counter per entry.
pub const MAX_PARTITION_ITEMS: usize = 1 << 24;

// == Cache Partition ==
/// Definition of one cache region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePartition {
    /// Key prefix, unique amongst all partitions of a registry
    pub namespace: String,
    /// Time-to-live of every entry; zero disables expiry
    pub ttl: Duration,
    /// Maximum resident entries
    pub max_items: usize,
}

impl CachePartition {
    pub fn new(namespace: impl Into<String>, ttl: Duration, max_items: usize) -> Self {
        Self {
            namespace: namespace.into(),
            ttl,
            max_items,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(CacheError::InvalidPartition(
                "namespace must not be empty".to_string(),
            ));
        }
        if self.max_items == 0 {
            return Err(CacheError::InvalidPartition(format!(
                "partition {} must hold at least one item",
                self.namespace
            )));
        }
        if self.max_items > MAX_PARTITION_ITEMS {
            return Err(CacheError::InvalidPartition(format!(
                "partition {} declares maxItems={}, the limit is {}",
                self.namespace, self.max_items, MAX_PARTITION_ITEMS
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CachePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{namespace={} ttl={:?} maxItems={}}}",
            self.namespace, self.ttl, self.max_items
        )
    }
}

// == Partition Handle ==
#[derive(Debug)]
struct PartitionState {
    partition: CachePartition,
    clock: Arc<dyn Clock>,
    /// `None` when the registry is disabled
    store: Option<Mutex<TinyLfu>>,
}

/// Cheaply cloneable handle to one registered partition.
#[derive(Debug, Clone)]
pub struct PartitionHandle {
    inner: Arc<PartitionState>,
}

impl PartitionHandle {
    pub fn partition(&self) -> &CachePartition {
        &self.inner.partition
    }

    pub fn namespace(&self) -> &str {
        &self.inner.partition.namespace
    }

    /// Builds the key for `raw_key` in this partition.
    pub fn key(&self, raw_key: &str) -> CacheKey {
        CacheKey::encode(self.namespace(), raw_key)
    }

    /// Returns `true` when writes are actually stored.
    pub fn is_enabled(&self) -> bool {
        self.inner.store.is_some()
    }

    // == Get ==
    /// Returns the stored bytes for `key`, or `None` on a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Arc<[u8]>>> {
        self.check(key)?;
        debug!("Get item from in-mem cache by cacheKey={}", key);
        let Some(store) = &self.inner.store else {
            return Ok(None);
        };
        let now = self.inner.clock.now();
        Ok(store.lock().get(key.as_str(), now))
    }

    // == Set ==
    /// Stores `value` under `key`, evicting as needed.
    pub fn set(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        self.check(key)?;
        debug!("Set item in in-mem cache by cacheKey={}", key);
        let Some(store) = &self.inner.store else {
            return Ok(());
        };
        let value: Arc<[u8]> = value.into();
        let now = self.inner.clock.now();
        store.lock().insert(key.encoded_key.clone(), value, now);
        Ok(())
    }

    // == Delete ==
    /// Removes `key`; deleting an absent key is not an error.
    pub fn delete(&self, key: &CacheKey) -> Result<()> {
        self.check(key)?;
        debug!("Delete item in in-mem cache by cacheKey={}", key);
        if let Some(store) = &self.inner.store {
            store.lock().remove(key.as_str());
        }
        Ok(())
    }

    /// Resident entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner
            .store
            .as_ref()
            .map(|store| store.lock().len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .store
            .as_ref()
            .map(|store| store.lock().stats())
            .unwrap_or_default()
    }

    /// Runs `f` with the partition's policy locked. `None` when disabled.
    pub fn inspect<R>(&self, f: impl FnOnce(&TinyLfu) -> R) -> Option<R> {
        self.inner.store.as_ref().map(|store| f(&store.lock()))
    }

    fn check(&self, key: &CacheKey) -> Result<()> {
        if key.namespace != self.inner.partition.namespace {
            return Err(CacheError::NamespaceMismatch {
                expected: self.inner.partition.namespace.clone(),
                actual: key.namespace.clone(),
            });
        }
        Ok(())
    }
}

// == Cache Registry ==
/// Owner of all partitions of one process.
#[derive(Debug)]
pub struct CacheRegistry {
    kind: CacheKind,
    tuning: PolicyTuning,
    clock: Arc<dyn Clock>,
    partitions: RwLock<HashMap<String, PartitionHandle>>,
}

impl CacheRegistry {
    // == Constructor ==
    pub fn new(kind: CacheKind, tuning: PolicyTuning) -> Self {
        Self {
            kind,
            tuning,
            clock: Arc::new(SystemClock),
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// In-memory registry with default tuning.
    pub fn in_memory() -> Self {
        Self::new(CacheKind::InMemory, PolicyTuning::default())
    }

    /// Registry that registers partitions but never stores anything.
    pub fn disabled() -> Self {
        Self::new(CacheKind::Disabled, PolicyTuning::default())
    }

    pub fn from_config(config: &Config) -> Self {
        info!("Using cache type={}", config.cache_kind);
        Self::new(config.cache_kind, config.policy())
    }

    /// Replaces the time source used by partitions registered afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    // == Register ==
    /// Creates the partition for `partition.namespace`.
    ///
    /// Registration is one-shot: a second call with the same namespace
    /// fails with `DuplicateNamespace` and leaves the first untouched.
    pub fn register(&self, partition: CachePartition) -> Result<PartitionHandle> {
        partition.validate()?;

        let mut partitions = self.partitions.write();
        if partitions.contains_key(&partition.namespace) {
            return Err(CacheError::DuplicateNamespace(partition.namespace));
        }

        let store = match self.kind {
            CacheKind::InMemory => Some(Mutex::new(TinyLfu::new(
                partition.max_items,
                partition.ttl,
                &self.tuning,
            ))),
            CacheKind::Disabled => None,
        };
        info!("Registered cache partition {}", partition);

        let handle = PartitionHandle {
            inner: Arc::new(PartitionState {
                partition: partition.clone(),
                clock: Arc::clone(&self.clock),
                store,
            }),
        };
        partitions.insert(partition.namespace, handle.clone());
        Ok(handle)
    }

    // == Resolve ==
    /// Returns the handle of a registered namespace.
    pub fn resolve(&self, namespace: &str) -> Result<PartitionHandle> {
        self.partitions
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| CacheError::UnknownNamespace(namespace.to_string()))
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.partitions.read().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    /// Statistics of every partition, sorted by namespace.
    pub fn stats(&self) -> Vec<(String, CacheStats)> {
        let handles: Vec<PartitionHandle> = self.partitions.read().values().cloned().collect();
        let mut stats: Vec<(String, CacheStats)> = handles
            .iter()
            .map(|handle| (handle.namespace().to_string(), handle.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    // == Key-addressed Access ==
    /// Stores bytes under `key`, resolving the partition from its namespace.
    pub fn set(&self, key: &CacheKey, value: Vec<u8>) -> Result<()> {
        self.resolve(&key.namespace)?.set(key, value)
    }

    pub fn get(&self, key: &CacheKey) -> Result<Option<Arc<[u8]>>> {
        self.resolve(&key.namespace)?.get(key)
    }

    pub fn delete(&self, key: &CacheKey) -> Result<()> {
        self.resolve(&key.namespace)?.delete(key)
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}
