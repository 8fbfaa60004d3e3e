//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Segment of the eviction policy an entry currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Recently admitted, not yet tested against the main segment
    Window,
    /// Main segment, admitted but not re-accessed since
    Probationary,
    /// Main segment, accessed again while probationary
    Protected,
}

// == Cache Entry ==
/// A single cache entry with its value and placement metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded key
    pub key: String,
    /// The stored value
    pub value: Arc<[u8]>,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Owning segment
    pub segment: Segment,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new window entry expiring `ttl` after `now`.
    ///
    /// A zero `ttl` means the entry never expires.
    pub fn new(key: String, value: Arc<[u8]>, ttl: Duration, now: Instant) -> Self {
        Self {
            key,
            value,
            expires_at: deadline(now, ttl),
            segment: Segment::Window,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now >= expires_at`, so after the TTL has
    /// fully elapsed it is immediately treated as absent.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

/// Absolute expiry for an entry written at `now`.
pub fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Duration, now: Instant) -> CacheEntry {
        CacheEntry::new("ns:key".to_string(), Arc::from(&b"value"[..]), ttl, now)
    }

    #[test]
    fn test_entry_creation_no_ttl() {
        let now = Instant::now();
        let entry = entry(Duration::ZERO, now);

        assert_eq!(&*entry.value, b"value");
        assert_eq!(entry.segment, Segment::Window);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(now + Duration::from_secs(3600)));
        assert!(entry.ttl_remaining(now).is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let now = Instant::now();
        let entry = entry(Duration::from_secs(60), now);

        assert_eq!(entry.expires_at, Some(now + Duration::from_secs(60)));
        assert!(!entry.is_expired(now));
        assert_eq!(entry.ttl_remaining(now), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let ttl = Duration::from_secs(10);
        let entry = entry(ttl, now);

        assert!(!entry.is_expired(now + ttl - Duration::from_millis(1)));
        assert!(entry.is_expired(now + ttl), "Entry should be expired at boundary");
        assert_eq!(entry.ttl_remaining(now + ttl * 2), Some(Duration::ZERO));
    }
}
