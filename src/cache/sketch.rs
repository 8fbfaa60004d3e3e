//! Frequency Sketch Module
//!
//! Count-min sketch of 4-bit counters used to estimate how often a key was
//! accessed recently.
//!
//! Each row is a run of `u64` words holding 16 counters apiece. A key maps to
//! one counter per row; the estimate is the minimum of those counters. After
//! a fixed number of increments every counter is halved, so the sketch
//! follows recent popularity instead of all-time popularity.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Number of independent counter rows.
pub const SKETCH_DEPTH: usize = 4;

/// Largest value a counter can hold.
pub const MAX_FREQUENCY: u8 = 15;

const COUNTERS_PER_WORD: usize = 16;
const MIN_WIDTH: usize = 16;
/// Widest row, 32 MiB of counters across all rows.
pub const MAX_WIDTH: usize = 1 << 24;
const RESET_MASK: u64 = 0x7777_7777_7777_7777;

const SEEDS: [u64; SKETCH_DEPTH] = [
    0xc3a5_c85c_97cb_3127,
    0xb492_b66f_be98_f273,
    0x9ae1_6a3b_2f90_404f,
    0xcbf2_9ce4_8422_2325,
];

// == Frequency Sketch ==
#[derive(Debug, Clone)]
pub struct FrequencySketch {
    /// `SKETCH_DEPTH` rows of `width / 16` words each
    table: Vec<u64>,
    /// Counters per row, a power of two
    width: usize,
    words_per_row: usize,
    /// Increments since the last halving
    additions: usize,
    /// Increments that trigger a halving
    sample_size: usize,
}

impl FrequencySketch {
    // == Constructor ==
    /// Creates a sketch sized for `max_items` entries.
    ///
    /// Row width is the next power of two at or above `max_items`, kept
    /// within 16..=[`MAX_WIDTH`]. Counters are halved after
    /// `decay_multiplier * width` increments.
    pub fn new(max_items: usize, decay_multiplier: usize) -> Self {
        let width = max_items.clamp(MIN_WIDTH, MAX_WIDTH).next_power_of_two();
        let words_per_row = width / COUNTERS_PER_WORD;

        Self {
            table: vec![0; SKETCH_DEPTH * words_per_row],
            width,
            words_per_row,
            additions: 0,
            sample_size: width.saturating_mul(decay_multiplier.max(1)),
        }
    }

    /// Counters per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of increments after which all counters are halved.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    // == Increment ==
    /// Records one access of `key`.
    ///
    /// Only the counters currently holding the row minimum are bumped, which
    /// keeps over-estimation from hash collisions low. Counters saturate at
    /// [`MAX_FREQUENCY`].
    pub fn increment<K: Hash + ?Sized>(&mut self, key: &K) {
        let slots = self.slots(key);
        let min = self.min_of(&slots);

        if min < MAX_FREQUENCY {
            for (row, &index) in slots.iter().enumerate() {
                if self.counter(row, index) == min {
                    self.add_one(row, index);
                }
            }
        }

        self.additions += 1;
        self.maybe_decay_all();
    }

    // == Estimate ==
    /// Returns the estimated recent access count of `key`.
    pub fn estimate<K: Hash + ?Sized>(&self, key: &K) -> u8 {
        let slots = self.slots(key);
        self.min_of(&slots)
    }

    // == Decay ==
    /// Halves every counter once the sample size has been reached.
    ///
    /// Returns `true` if a halving happened.
    pub fn maybe_decay_all(&mut self) -> bool {
        if self.additions < self.sample_size {
            return false;
        }
        for word in self.table.iter_mut() {
            *word = (*word >> 1) & RESET_MASK;
        }
        self.additions /= 2;
        true
    }

    fn slots<K: Hash + ?Sized>(&self, key: &K) -> [usize; SKETCH_DEPTH] {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish();

        let mask = (self.width - 1) as u64;
        let mut slots = [0usize; SKETCH_DEPTH];
        for (row, slot) in slots.iter_mut().enumerate() {
            *slot = (spread(hash ^ SEEDS[row]) & mask) as usize;
        }
        slots
    }

    fn min_of(&self, slots: &[usize; SKETCH_DEPTH]) -> u8 {
        slots
            .iter()
            .enumerate()
            .map(|(row, &index)| self.counter(row, index))
            .min()
            .unwrap_or(0)
    }

    fn locate(&self, row: usize, index: usize) -> (usize, u32) {
        let word = row * self.words_per_row + index / COUNTERS_PER_WORD;
        let shift = ((index % COUNTERS_PER_WORD) * 4) as u32;
        (word, shift)
    }

    fn counter(&self, row: usize, index: usize) -> u8 {
        let (word, shift) = self.locate(row, index);
        ((self.table[word] >> shift) & 0xF) as u8
    }

    fn add_one(&mut self, row: usize, index: usize) {
        let (word, shift) = self.locate(row, index);
        if (self.table[word] >> shift) & 0xF < MAX_FREQUENCY as u64 {
            self.table[word] += 1u64 << shift;
        }
    }
}

/// 64-bit finalizer (splitmix64) so that each seeded row lands independently.
fn spread(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_is_power_of_two() {
        assert_eq!(FrequencySketch::new(1, 10).width(), 16);
        assert_eq!(FrequencySketch::new(1000, 10).width(), 1024);
        assert_eq!(FrequencySketch::new(1024, 10).width(), 1024);
        assert_eq!(FrequencySketch::new(1000, 10).sample_size(), 10_240);
    }

    #[test]
    fn test_width_is_capped() {
        let sketch = FrequencySketch::new(usize::MAX, usize::MAX);
        assert_eq!(sketch.width(), MAX_WIDTH);
        assert_eq!(sketch.sample_size(), usize::MAX);
    }

    #[test]
    fn test_unseen_key_estimates_zero() {
        let sketch = FrequencySketch::new(100, 10);
        assert_eq!(sketch.estimate("missing"), 0);
    }

    #[test]
    fn test_increment_and_estimate() {
        let mut sketch = FrequencySketch::new(100, 10);
        for _ in 0..5 {
            sketch.increment("hot");
        }
        sketch.increment("cold");

        assert_eq!(sketch.estimate("hot"), 5);
        assert_eq!(sketch.estimate("cold"), 1);
    }

    #[test]
    fn test_counters_saturate() {
        let mut sketch = FrequencySketch::new(1000, 100);
        for _ in 0..50 {
            sketch.increment("key");
        }
        assert_eq!(sketch.estimate("key"), MAX_FREQUENCY);
    }

    #[test]
    fn test_decay_halves_counters() {
        // width 16, sample size 16
        let mut sketch = FrequencySketch::new(16, 1);
        for _ in 0..12 {
            sketch.increment("hot");
        }
        assert_eq!(sketch.estimate("hot"), 12);

        for i in 0..4 {
            sketch.increment(&format!("filler-{}", i));
        }
        // The 16th increment triggered the halving
        assert_eq!(sketch.estimate("hot"), 6);
    }

    #[test]
    fn test_decay_not_triggered_early() {
        let mut sketch = FrequencySketch::new(16, 1);
        for _ in 0..10 {
            sketch.increment("key");
        }
        assert!(!sketch.maybe_decay_all());
        assert_eq!(sketch.estimate("key"), 10);
    }

    #[test]
    fn test_halving_does_not_bleed_between_counters() {
        let mut sketch = FrequencySketch::new(16, 1000);
        for _ in 0..15 {
            sketch.increment("a");
        }
        let before: Vec<u64> = sketch.table.clone();
        sketch.additions = sketch.sample_size;
        assert!(sketch.maybe_decay_all());
        for (after, before) in sketch.table.iter().zip(before) {
            assert_eq!(*after, (before >> 1) & RESET_MASK);
        }
        assert_eq!(sketch.estimate("a"), 7);
    }
}
