//! Value Codec Module
//!
//! Converts typed values to and from the bytes the cache stores.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Encodes and decodes values of type `T`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

// == MessagePack ==
/// Compact self-describing binary encoding; struct fields are kept by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl<T> Codec<T> for MsgPackCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).map_err(|e| CacheError::Decode(e.to_string()))
    }
}

// == JSON ==
/// Human readable encoding, handy when inspecting cached bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Decode(e.to_string()))
    }
}
