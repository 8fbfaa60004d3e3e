//! Cache Key Module
//!
//! Builds bounded-length keys of the form `namespace:key`.

use std::fmt;

use sha1::{Digest, Sha1};

/// Keys whose `namespace + key` length reaches this many bytes are digested.
pub const MAX_VERBATIM_KEY_LENGTH: usize = 100;

// == Cache Key ==
/// Lookup identity of an entry: the owning namespace plus the encoded key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Namespace the key belongs to
    pub namespace: String,
    /// `namespace:key`, or `namespace:<sha1 hex>` for long keys
    pub encoded_key: String,
}

impl CacheKey {
    // == Encode ==
    /// Creates a key from a namespace and a caller-supplied raw key.
    ///
    /// Short keys stay human readable. When `namespace.len() + raw_key.len()`
    /// is at least [`MAX_VERBATIM_KEY_LENGTH`], the raw key is replaced by
    /// its 40 character SHA-1 hex digest.
    pub fn encode(namespace: &str, raw_key: &str) -> Self {
        let encoded_key = if namespace.len() + raw_key.len() < MAX_VERBATIM_KEY_LENGTH {
            format!("{}:{}", namespace, raw_key)
        } else {
            format!("{}:{}", namespace, hex::encode(Sha1::digest(raw_key.as_bytes())))
        };

        Self {
            namespace: namespace.to_string(),
            encoded_key,
        }
    }

    /// Returns the encoded key string.
    pub fn as_str(&self) -> &str {
        &self.encoded_key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded_key)
    }
}
