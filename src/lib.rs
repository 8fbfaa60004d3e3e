//! nscache - An embedded, namespaced in-memory cache
//!
//! Independent call sites share one cache through registered partitions.
//! Each partition has its own TTL and size budget and evicts with a
//! frequency-gated W-TinyLFU policy.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    Built, CacheKey, CachePartition, CacheRegistry, Codec, JsonCodec, MsgPackCodec,
    PartitionHandle, TypedPartition,
};
pub use config::{CacheKind, Config};
pub use error::{CacheError, Result};
