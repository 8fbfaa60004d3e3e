//! Typed Access Module
//!
//! Binds a partition to a value type and a codec, and provides the
//! get-or-build idiom used in front of a backing store.
//!
//! Encoding and decoding run outside the partition lock, and so does the
//! builder. Concurrent misses on the same key each run their own builder;
//! there is no in-flight de-duplication.

use std::future::Future;
use std::marker::PhantomData;

use crate::cache::{Codec, MsgPackCodec, PartitionHandle};
use crate::error::{CacheError, Result};

// == Built ==
/// Value produced by a get-or-build builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built<T> {
    pub value: T,
    /// Return the value without caching it
    pub skip_cache: bool,
}

impl<T> Built<T> {
    /// A value that should be cached.
    pub fn cached(value: T) -> Self {
        Self {
            value,
            skip_cache: false,
        }
    }

    /// A value that should be returned but not cached.
    pub fn uncached(value: T) -> Self {
        Self {
            value,
            skip_cache: true,
        }
    }
}

// == Typed Partition ==
/// Partition view that stores values of type `T` encoded with `C`.
#[derive(Debug, Clone)]
pub struct TypedPartition<T, C = MsgPackCodec> {
    handle: PartitionHandle,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedPartition<T, MsgPackCodec>
where
    MsgPackCodec: Codec<T>,
{
    /// Typed view using MessagePack encoding.
    pub fn msgpack(handle: PartitionHandle) -> Self {
        Self::new(handle, MsgPackCodec)
    }
}

impl<T, C> TypedPartition<T, C>
where
    C: Codec<T>,
{
    pub fn new(handle: PartitionHandle, codec: C) -> Self {
        Self {
            handle,
            codec,
            _marker: PhantomData,
        }
    }

    pub fn handle(&self) -> &PartitionHandle {
        &self.handle
    }

    // == Get ==
    /// Returns the cached value for `raw_key`, or `None` on a miss.
    ///
    /// Bytes that fail to decode surface as [`CacheError::Decode`].
    pub fn get(&self, raw_key: &str) -> Result<Option<T>> {
        let key = self.handle.key(raw_key);
        match self.handle.get(&key)? {
            Some(bytes) => self.codec.decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    // == Set ==
    /// Encodes and stores `value` under `raw_key`.
    pub fn set(&self, raw_key: &str, value: &T) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.handle.set(&self.handle.key(raw_key), bytes)
    }

    // == Delete ==
    pub fn delete(&self, raw_key: &str) -> Result<()> {
        self.handle.delete(&self.handle.key(raw_key))
    }

    // == Get Or Build ==
    /// Returns the cached value, or runs `builder` on a miss.
    ///
    /// A builder error is returned as is and nothing is cached. A value
    /// built with [`Built::uncached`] is returned but not stored.
    pub fn get_or_build<E, F>(&self, raw_key: &str, builder: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<Built<T>, E>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get(raw_key)? {
            return Ok(value);
        }
        let built = builder()?;
        self.store_built(raw_key, built).map_err(E::from)
    }

    /// Async form of [`get_or_build`](Self::get_or_build); no lock is held
    /// while the builder future runs.
    pub async fn get_or_build_async<E, F, Fut>(
        &self,
        raw_key: &str,
        builder: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Built<T>, E>>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get(raw_key)? {
            return Ok(value);
        }
        let built = builder().await?;
        self.store_built(raw_key, built).map_err(E::from)
    }

    fn store_built(&self, raw_key: &str, built: Built<T>) -> Result<T> {
        if !built.skip_cache {
            self.set(raw_key, &built.value)?;
        }
        Ok(built.value)
    }
}
