//! TinyLFU Policy Module
//!
//! Window TinyLFU eviction: a small LRU window in front of a segmented LRU
//! main area, with admission into main gated by a frequency sketch.
//!
//! ```text
//!   insert ─► [ window ] ──candidate──► admission test ──► [ probationary ] ◄──┐
//!                                         │  loses            │ hit            │ demote
//!                                         ▼                   ▼                │
//!                                       evicted           [ protected ] ───────┘
//! ```
//!
//! Entries expire lazily: an expired entry is dropped when it is looked up
//! or when it is picked as a candidate or victim, never by a sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::entry::{deadline, CacheEntry, Segment};
use crate::cache::lru::{Arena, LruOrder, SlotId};
use crate::cache::sketch::FrequencySketch;
use crate::cache::CacheStats;

// == Policy Tuning ==
/// Segment ratios and sketch decay shared by all partitions of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTuning {
    /// Window share of `max_items`, in percent (window holds at least 1)
    pub window_percent: u8,
    /// Protected share of the main segment, in percent
    pub protected_percent: u8,
    /// Sketch counters are halved every `decay_multiplier * width` increments
    pub decay_multiplier: usize,
}

impl Default for PolicyTuning {
    fn default() -> Self {
        Self {
            window_percent: 1,
            protected_percent: 80,
            decay_multiplier: 10,
        }
    }
}

// == Segment Limits ==
/// Entry budgets of the three segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLimits {
    pub window: usize,
    /// Probationary + protected
    pub main: usize,
    pub protected: usize,
}

impl SegmentLimits {
    pub fn new(max_items: usize, tuning: &PolicyTuning) -> Self {
        let window_percent = usize::from(tuning.window_percent.min(100));
        let protected_percent = usize::from(tuning.protected_percent.min(100));

        let window = percent_of(max_items, window_percent).max(1).min(max_items);
        let main = max_items - window;
        let protected = percent_of(main, protected_percent);

        Self {
            window,
            main,
            protected,
        }
    }

    pub fn capacity(&self) -> usize {
        self.window.saturating_add(self.main)
    }

    pub fn probationary(&self) -> usize {
        self.main - self.protected
    }
}

/// `floor(value * percent / 100)` without overflowing for any `usize`.
fn percent_of(value: usize, percent: usize) -> usize {
    value / 100 * percent + value % 100 * percent / 100
}

// == TinyLFU ==
/// Bounded entry store for one partition.
///
/// Not synchronized; the owning partition wraps it in a lock.
#[derive(Debug)]
pub struct TinyLfu {
    limits: SegmentLimits,
    ttl: Duration,
    index: HashMap<String, SlotId>,
    arena: Arena<CacheEntry>,
    window: LruOrder,
    probationary: LruOrder,
    protected: LruOrder,
    sketch: FrequencySketch,
    stats: CacheStats,
}

impl TinyLfu {
    // == Constructor ==
    /// Creates a policy holding at most `max_items` entries.
    ///
    /// A zero `ttl` disables expiry.
    pub fn new(max_items: usize, ttl: Duration, tuning: &PolicyTuning) -> Self {
        Self::with_parts(
            SegmentLimits::new(max_items, tuning),
            ttl,
            FrequencySketch::new(max_items, tuning.decay_multiplier),
        )
    }

    pub(crate) fn with_parts(limits: SegmentLimits, ttl: Duration, sketch: FrequencySketch) -> Self {
        Self {
            limits,
            ttl,
            index: HashMap::new(),
            arena: Arena::new(),
            window: LruOrder::new(),
            probationary: LruOrder::new(),
            protected: LruOrder::new(),
            sketch,
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Looks up `key`, recording a hit on success.
    ///
    /// An expired entry is removed and reported as a miss; it does not
    /// count towards the key's frequency.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Arc<[u8]>> {
        let Some(&id) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if self.is_expired(id, now) {
            self.remove_slot(id);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.sync_len();
            return None;
        }

        self.on_hit(id);
        self.stats.record_hit();
        self.arena.get(id).map(|entry| Arc::clone(&entry.value))
    }

    // == Insert ==
    /// Stores `value` under `key`.
    ///
    /// An existing live entry is overwritten in place: it keeps its segment
    /// and position, gets a fresh expiry and counts as an access. A new
    /// entry enters the window; window overflow runs the admission test.
    /// Never fails: a full partition always makes room.
    pub fn insert(&mut self, key: String, value: Arc<[u8]>, now: Instant) {
        if let Some(&id) = self.index.get(&key) {
            if !self.is_expired(id, now) {
                self.sketch.increment(key.as_str());
                if let Some(entry) = self.arena.get_mut(id) {
                    entry.value = value;
                    entry.expires_at = deadline(now, self.ttl);
                }
                return;
            }
            self.remove_slot(id);
            self.stats.record_expiration();
        }

        self.sketch.increment(key.as_str());
        let id = self
            .arena
            .insert(CacheEntry::new(key.clone(), value, self.ttl, now));
        self.index.insert(key, id);
        self.window.push_front(&mut self.arena, id);

        self.evict_window_overflow(now);
        self.sync_len();
    }

    // == Remove ==
    /// Deletes `key`. The sketch keeps its (now stale) estimate.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = match self.index.get(key) {
            Some(&id) => self.remove_slot(id).is_some(),
            None => false,
        };
        self.sync_len();
        removed
    }

    // == Inspection ==
    /// Returns `true` if `key` is resident and not expired. No side effects.
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        self.index
            .get(key)
            .is_some_and(|&id| !self.is_expired(id, now))
    }

    /// Segment currently holding `key`, expired or not.
    pub fn segment_of(&self, key: &str) -> Option<Segment> {
        let id = self.index.get(key)?;
        self.arena.get(*id).map(|entry| entry.segment)
    }

    /// Remaining lifetime of `key`; `None` if absent or without expiry.
    pub fn ttl_remaining(&self, key: &str, now: Instant) -> Option<Duration> {
        let id = self.index.get(key)?;
        self.arena.get(*id).and_then(|entry| entry.ttl_remaining(now))
    }

    /// Sketch estimate for `key`.
    pub fn frequency(&self, key: &str) -> u8 {
        self.sketch.estimate(key)
    }

    /// Resident entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn limits(&self) -> SegmentLimits {
        self.limits
    }

    /// Entries per segment as `(window, probationary, protected)`.
    pub fn segment_lens(&self) -> (usize, usize, usize) {
        (self.window.len(), self.probationary.len(), self.protected.len())
    }

    /// Keys of one segment from most to least recently used.
    pub fn keys_in(&self, segment: Segment) -> Vec<String> {
        let order = match segment {
            Segment::Window => &self.window,
            Segment::Probationary => &self.probationary,
            Segment::Protected => &self.protected,
        };
        order
            .iter(&self.arena)
            .filter_map(|id| self.arena.get(id).map(|entry| entry.key.clone()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    // == Hit ==
    fn on_hit(&mut self, id: SlotId) {
        let Some(entry) = self.arena.get(id) else {
            return;
        };
        self.sketch.increment(entry.key.as_str());
        let segment = entry.segment;

        match segment {
            Segment::Window => self.window.move_to_front(&mut self.arena, id),
            Segment::Probationary => {
                self.probationary.unlink(&mut self.arena, id);
                self.link_front(id, Segment::Protected);
                self.rebalance_main();
            }
            Segment::Protected => self.protected.move_to_front(&mut self.arena, id),
        }
    }

    // == Admission ==
    /// Moves window overflow into main, through the admission test once
    /// main is full.
    fn evict_window_overflow(&mut self, now: Instant) {
        while self.window.len() > self.limits.window {
            let Some(candidate) = self.window.pop_back(&mut self.arena) else {
                break;
            };

            if self.is_expired(candidate, now) {
                self.discard(candidate);
                self.stats.record_expiration();
                continue;
            }

            if self.main_len() < self.limits.main {
                self.link_front(candidate, Segment::Probationary);
                self.stats.record_admission();
                continue;
            }

            let Some(victim) = self.probationary.back().or_else(|| self.protected.back()) else {
                // No main segment at all
                self.discard(candidate);
                self.stats.record_rejection();
                self.stats.record_eviction();
                continue;
            };

            if self.is_expired(victim, now) {
                self.remove_slot(victim);
                self.stats.record_expiration();
            } else if self.admits(candidate, victim) {
                self.remove_slot(victim);
                self.stats.record_eviction();
            } else {
                self.discard(candidate);
                self.stats.record_rejection();
                self.stats.record_eviction();
                continue;
            }

            self.link_front(candidate, Segment::Probationary);
            self.stats.record_admission();
        }
    }

    /// Candidate must be strictly more frequent; ties keep the victim.
    fn admits(&self, candidate: SlotId, victim: SlotId) -> bool {
        let estimate = |id| {
            self.arena
                .get(id)
                .map(|entry| self.sketch.estimate(entry.key.as_str()))
                .unwrap_or(0)
        };
        estimate(candidate) > estimate(victim)
    }

    /// Pushes protected overflow down to probationary, then evicts while
    /// main as a whole is over budget.
    fn rebalance_main(&mut self) {
        while self.protected.len() > self.limits.protected {
            let Some(id) = self.protected.pop_back(&mut self.arena) else {
                break;
            };
            self.link_front(id, Segment::Probationary);
        }

        while self.main_len() > self.limits.main {
            let Some(id) = self.probationary.back().or_else(|| self.protected.back()) else {
                break;
            };
            self.remove_slot(id);
            self.stats.record_eviction();
        }
    }

    // == Slot Helpers ==
    fn main_len(&self) -> usize {
        self.probationary.len() + self.protected.len()
    }

    fn is_expired(&self, id: SlotId, now: Instant) -> bool {
        self.arena
            .get(id)
            .is_some_and(|entry| entry.is_expired(now))
    }

    /// Links an unlinked slot at the front of `segment`.
    fn link_front(&mut self, id: SlotId, segment: Segment) {
        if let Some(entry) = self.arena.get_mut(id) {
            entry.segment = segment;
        }
        match segment {
            Segment::Window => self.window.push_front(&mut self.arena, id),
            Segment::Probationary => self.probationary.push_front(&mut self.arena, id),
            Segment::Protected => self.protected.push_front(&mut self.arena, id),
        }
    }

    /// Unlinks a slot from its segment and frees it.
    fn remove_slot(&mut self, id: SlotId) -> Option<CacheEntry> {
        let segment = self.arena.get(id)?.segment;
        match segment {
            Segment::Window => self.window.unlink(&mut self.arena, id),
            Segment::Probationary => self.probationary.unlink(&mut self.arena, id),
            Segment::Protected => self.protected.unlink(&mut self.arena, id),
        }
        self.discard(id)
    }

    /// Frees a slot that is already unlinked.
    fn discard(&mut self, id: SlotId) -> Option<CacheEntry> {
        let entry = self.arena.remove(id)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    fn sync_len(&mut self) {
        self.stats.set_total_entries(self.index.len());
    }
}
