//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Configuration errors (`DuplicateNamespace`, `UnknownNamespace`,
/// `InvalidPartition`, `InvalidConfig`) are misconfiguration and are not
/// meant to be retried. `Encode` and `Decode` come from the value codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Namespace was already registered
    #[error("Cache partition with namespace={0} was already registered")]
    DuplicateNamespace(String),

    /// Namespace was never registered
    #[error("Cache partition with namespace={0} was not registered")]
    UnknownNamespace(String),

    /// Partition definition is unusable
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    /// Key built for one partition was presented to another
    #[error("Key for namespace={actual} used with partition namespace={expected}")]
    NamespaceMismatch { expected: String, actual: String },

    /// Value could not be serialized
    #[error("Error marshalling value: {0}")]
    Encode(String),

    /// Stored bytes could not be deserialized
    #[error("Error unmarshalling value: {0}")]
    Decode(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
