//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::cache::PolicyTuning;
use crate::error::{CacheError, Result};

/// Which cache backend the registry hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// Entries live in process memory under the TinyLFU policy
    #[default]
    InMemory,
    /// Partitions are registered but nothing is ever stored
    Disabled,
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inmem" => Ok(CacheKind::InMemory),
            "none" => Ok(CacheKind::Disabled),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::InMemory => write!(f, "inmem"),
            CacheKind::Disabled => write!(f, "none"),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend selected for every partition
    pub cache_kind: CacheKind,
    /// Share of each partition's `max_items` given to the admission window
    pub window_percent: u8,
    /// Share of the main segment reserved for protected entries
    pub protected_percent: u8,
    /// Sketch halves its counters after `decay_multiplier * width` increments
    pub decay_multiplier: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TYPE` - `inmem` or `none` (default: inmem)
    /// - `CACHE_WINDOW_PERCENT` - Window share in percent (default: 1)
    /// - `CACHE_PROTECTED_PERCENT` - Protected share of main in percent (default: 80)
    /// - `CACHE_DECAY_MULTIPLIER` - Sketch reset period multiplier (default: 10)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let cache_kind = match env::var("CACHE_TYPE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.cache_kind,
        };

        Ok(Self {
            cache_kind,
            window_percent: env::var("CACHE_WINDOW_PERCENT")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .map(|v| v.min(100))
                .unwrap_or(defaults.window_percent),
            protected_percent: env::var("CACHE_PROTECTED_PERCENT")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .map(|v| v.min(100))
                .unwrap_or(defaults.protected_percent),
            decay_multiplier: env::var("CACHE_DECAY_MULTIPLIER")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.decay_multiplier),
        })
    }

    /// Policy tuning shared by every partition of a registry.
    pub fn policy(&self) -> PolicyTuning {
        PolicyTuning {
            window_percent: self.window_percent,
            protected_percent: self.protected_percent,
            decay_multiplier: self.decay_multiplier,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let tuning = PolicyTuning::default();
        Self {
            cache_kind: CacheKind::InMemory,
            window_percent: tuning.window_percent,
            protected_percent: tuning.protected_percent,
            decay_multiplier: tuning.decay_multiplier,
        }
    }
}
