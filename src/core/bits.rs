//! Shared atomic bit storage.
//!
//! [`AtomicBitArray`] is the word array backing a live filter: a fixed-size
//! `Box<[AtomicU64]>` supporting lock-free, monotone bit sets from `&self`.
//! Bits only ever transition 0 -> 1; nothing after construction clears them.
//!
//! # Set protocol
//!
//! Every write goes through [`AtomicBitArray::or_word`]:
//!
//! 1. Atomically load the word.
//! 2. If all requested bits are already set, return without writing.
//! 3. Otherwise CAS the word to `word | bits`; on failure, reload and retry.
//!
//! The retry loop terminates because every interfering writer can only add
//! bits, and a word holds finitely many.
//!
//! # Memory ordering
//!
//! Successful CAS publishes with `Release`; reads use `Acquire`. A completed
//! set therefore happens-before any get that observes it, so an insert that
//! returned before a query began can never be reported absent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-size array of 64-bit words with atomic, monotone bit sets.
///
/// # Examples
///
/// ```
/// use bloomwire::core::bits::AtomicBitArray;
///
/// let bits = AtomicBitArray::new(4);
/// bits.set(70);
/// assert!(bits.get(70));
/// assert!(!bits.get(71));
/// assert_eq!(bits.count_ones(), 1);
/// ```
#[derive(Debug)]
pub struct AtomicBitArray {
    words: Box<[AtomicU64]>,
}

impl AtomicBitArray {
    /// Allocate a zeroed array of `word_count` 64-bit words.
    #[must_use]
    pub fn new(word_count: usize) -> Self {
        debug_assert!(word_count > 0, "bit array must hold at least one word");
        let words = std::iter::repeat_with(|| AtomicU64::new(0))
            .take(word_count)
            .collect();
        Self { words }
    }

    /// Build an array from already-populated words.
    #[must_use]
    pub fn from_words(words: Vec<u64>) -> Self {
        let words = words.into_iter().map(AtomicU64::new).collect();
        Self { words }
    }

    /// Number of 64-bit words.
    #[must_use]
    #[inline]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Set a single bit, lock-free.
    ///
    /// Idempotent: re-setting an already-set bit performs no write at all
    /// (the protocol's early exit).
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the array.
    #[inline]
    pub fn set(&self, index: usize) {
        self.or_word(index / 64, 1u64 << (index % 64));
    }

    /// OR a mask into the word at `index` using the set protocol: load,
    /// early-exit when no bit would change, otherwise CAS with retry.
    ///
    /// # Panics
    ///
    /// Panics if `index >= word_count()`.
    pub fn or_word(&self, index: usize, bits: u64) {
        let word = &self.words[index];
        let mut current = word.load(Ordering::Acquire);
        while current | bits != current {
            match word.compare_exchange_weak(
                current,
                current | bits,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Test a single bit with one atomic load.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the array.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        let word = self.words[index / 64].load(Ordering::Acquire);
        word & (1u64 << (index % 64)) != 0
    }

    /// Atomically load the word at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= word_count()`.
    #[must_use]
    #[inline]
    pub fn load_word(&self, index: usize) -> u64 {
        self.words[index].load(Ordering::Acquire)
    }

    /// Population count over the whole array.
    #[must_use]
    pub fn count_ones(&self) -> u64 {
        self.count_ones_in_words(0..self.words.len())
    }

    /// Population count over a word range.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the array.
    #[must_use]
    pub fn count_ones_in_words(&self, range: std::ops::Range<usize>) -> u64 {
        self.words[range]
            .iter()
            .map(|word| u64::from(word.load(Ordering::Acquire).count_ones()))
            .sum()
    }

    /// Copy out every word with individual atomic loads.
    ///
    /// Under concurrent writers the words are each internally consistent
    /// but the vector as a whole is not a point-in-time snapshot; it holds
    /// at least the bits set before the call and at most those set when it
    /// returned.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u64> {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Acquire))
            .collect()
    }
}

impl Clone for AtomicBitArray {
    fn clone(&self) -> Self {
        Self::from_words(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_and_get() {
        let bits = AtomicBitArray::new(2);
        assert!(!bits.get(0));
        bits.set(0);
        bits.set(63);
        bits.set(64);
        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(!bits.get(65));
        assert_eq!(bits.count_ones(), 3);
    }

    #[test]
    fn set_is_idempotent() {
        let bits = AtomicBitArray::new(1);
        bits.set(10);
        bits.set(10);
        assert_eq!(bits.count_ones(), 1);
    }

    #[test]
    fn or_word_merges_masks() {
        let bits = AtomicBitArray::new(2);
        bits.or_word(1, 0xF0);
        bits.or_word(1, 0x0F);
        assert_eq!(bits.load_word(1), 0xFF);
        assert_eq!(bits.load_word(0), 0);
    }

    #[test]
    fn count_ones_in_words_is_range_scoped() {
        let bits = AtomicBitArray::new(4);
        bits.or_word(0, u64::MAX);
        bits.or_word(2, 0b101);
        assert_eq!(bits.count_ones_in_words(0..1), 64);
        assert_eq!(bits.count_ones_in_words(1..3), 2);
        assert_eq!(bits.count_ones(), 66);
    }

    #[test]
    fn from_words_round_trips_snapshot() {
        let bits = AtomicBitArray::from_words(vec![1, 2, 3]);
        assert_eq!(bits.snapshot(), vec![1, 2, 3]);
        let copy = bits.clone();
        bits.set(64 * 2 + 2);
        assert_eq!(copy.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_sets_all_land() {
        let bits = Arc::new(AtomicBitArray::new(16));
        let threads = 4;
        let per_thread = 256;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let bits = Arc::clone(&bits);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        bits.set(t * per_thread + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(bits.count_ones(), (threads * per_thread) as u64);
    }

    #[test]
    fn contended_word_keeps_every_bit() {
        let bits = Arc::new(AtomicBitArray::new(1));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let bits = Arc::clone(&bits);
                thread::spawn(move || {
                    for i in 0..8 {
                        bits.set(t * 8 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bits.load_word(0), u64::MAX);
    }
}
