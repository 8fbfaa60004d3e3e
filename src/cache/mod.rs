//! Cache Module
//!
//! Namespaced in-memory caching with lazy TTL expiry and W-TinyLFU eviction.
//!
//! Data flow for a typed write:
//! `TypedPartition` (codec) → `PartitionHandle` (key check, lock) →
//! `TinyLfu` (window / probationary / protected + frequency sketch).

mod clock;
mod codec;
mod entry;
mod key;
mod lru;
mod policy;
mod registry;
mod sketch;
mod stats;
mod typed;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, JsonCodec, MsgPackCodec};
pub use entry::{CacheEntry, Segment};
pub use key::{CacheKey, MAX_VERBATIM_KEY_LENGTH};
pub use lru::{Arena, LruOrder, SlotId};
pub use policy::{PolicyTuning, SegmentLimits, TinyLfu};
pub use registry::{CachePartition, CacheRegistry, PartitionHandle, MAX_PARTITION_ITEMS};
pub use sketch::{FrequencySketch, MAX_FREQUENCY, MAX_WIDTH, SKETCH_DEPTH};
pub use stats::CacheStats;
pub use typed::{Built, TypedPartition};
