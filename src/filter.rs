//! The live partitioned Bloom filter.
//!
//! A [`PartitionedFilter`] splits its bit array into `k` equal partitions of
//! `m = 2^b` bits, one per hash function; hash `j` only ever touches
//! partition `j`. All mutation goes through the atomic set protocol in
//! [`crate::core::bits`], so inserts and queries are lock-free and safe from
//! any number of threads sharing the filter behind an `Arc`.
//!
//! The filter is monotone: bits transition 0 -> 1 and never back. There is
//! no deletion and no resizing; a filter holds exactly the capacity it was
//! sized for at construction.
//!
//! # Concurrency
//!
//! - `insert` / `merge_from` mutate through `&self` with per-word CAS.
//! - `contains` is a sequence of single atomic loads.
//! - An insert that completed before a query began is always observed (the
//!   set protocol publishes with `Release`, queries load with `Acquire`).
//! - A query racing a multi-bit insert may see only some of its bits; it
//!   then reports the item absent, which is the correct answer for an
//!   insertion that has not yet completed.
//! - `encode` under concurrent writers yields a valid filter containing at
//!   least the bits set before the call began.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::bits::AtomicBitArray;
use crate::core::params::{self, FilterParams};
use crate::encoded::{self, EncodedFilter};
use crate::error::{BloomWireError, Result};
use crate::hash::{self, HashEngine, MAX_CUSTOM_HASH_ID};
use crate::merge::{self, WordView};

/// Fixed-capacity partitioned Bloom filter over atomic words.
///
/// # Examples
///
/// ```
/// use bloomwire::PartitionedFilter;
///
/// let filter: PartitionedFilter<&str> = PartitionedFilter::new(1000, 0.01).unwrap();
/// filter.insert(&"hello");
///
/// assert!(filter.contains(&"hello"));
/// assert!(!filter.contains(&"goodbye"));
/// ```
///
/// Concurrent use needs no external locking:
///
/// ```
/// use bloomwire::PartitionedFilter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let filter = Arc::new(PartitionedFilter::<u64>::new(10_000, 0.01).unwrap());
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let filter = Arc::clone(&filter);
///         thread::spawn(move || {
///             for i in 0..100u64 {
///                 filter.insert(&(t * 100 + i));
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert!(filter.contains(&0));
/// assert!(filter.contains(&399));
/// ```
pub struct PartitionedFilter<T> {
    params: FilterParams,
    engine: Arc<dyn HashEngine>,
    bits: AtomicBitArray,
    _items: PhantomData<fn(&T)>,
}

impl<T: Hash> PartitionedFilter<T> {
    /// Create a filter sized for `capacity` items at false positive
    /// probability `fpp`, using the default hash engine for the derived
    /// partition width.
    ///
    /// # Errors
    ///
    /// - [`BloomWireError::InvalidParameters`] if `capacity == 0` or `fpp`
    ///   is outside `(0, 1)`.
    /// - [`BloomWireError::UnsupportedCapacity`] if the sizing math needs
    ///   partitions wider than 2^48 bits.
    pub fn new(capacity: usize, fpp: f64) -> Result<Self> {
        let params = FilterParams::derive(capacity, fpp)?;
        let engine = hash::resolve(params.hash_id())?;
        Ok(Self::from_parts(
            params,
            engine,
            AtomicBitArray::new(params.word_count()),
        ))
    }

    /// Create a filter that positions items with a previously registered
    /// custom hash engine instead of the built-in tier.
    ///
    /// # Errors
    ///
    /// In addition to the [`new`](Self::new) errors:
    ///
    /// - [`BloomWireError::InvalidParameters`] if `hash_id` is above
    ///   [`MAX_CUSTOM_HASH_ID`].
    /// - [`BloomWireError::UnknownHashId`] if nothing is registered under
    ///   `hash_id`.
    pub fn with_hash_id(capacity: usize, fpp: f64, hash_id: u8) -> Result<Self> {
        if hash_id > MAX_CUSTOM_HASH_ID {
            return Err(BloomWireError::invalid_parameters(format!(
                "hash id {hash_id} is outside the custom range 0..={MAX_CUSTOM_HASH_ID}; \
                 built-in engines are selected automatically"
            )));
        }
        let params = FilterParams::derive(capacity, fpp)?.with_hash_id(hash_id);
        let engine = hash::resolve(hash_id)?;
        Ok(Self::from_parts(
            params,
            engine,
            AtomicBitArray::new(params.word_count()),
        ))
    }

    /// Rebuild a live filter from its encoded form.
    ///
    /// The result is bitwise equivalent to the filter that produced the
    /// bytes: every read operation answers identically.
    ///
    /// # Errors
    ///
    /// - [`BloomWireError::MalformedBinary`] if the bytes fail header or
    ///   length validation.
    /// - [`BloomWireError::UnknownHashId`] if the header names a custom
    ///   engine this process has not registered.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let params = encoded::parse_header(bytes)?;
        let engine = hash::resolve(params.hash_id())?;
        let words = encoded::words_from_wire(bytes, params.word_count());
        Ok(Self::from_parts(
            params,
            engine,
            AtomicBitArray::from_words(words),
        ))
    }

    /// Union of all `sources` as a fresh live filter.
    ///
    /// Sources may mix live filters and encoded blobs; every input must
    /// share the same `(hash_id, k, b)`.
    ///
    /// # Errors
    ///
    /// - [`BloomWireError::InvalidParameters`] if `sources` is empty.
    /// - [`BloomWireError::IncompatibleFilters`] on any parameter mismatch.
    /// - [`BloomWireError::UnknownHashId`] if the shared id is a custom
    ///   engine this process has not registered.
    pub fn merge(sources: &[&dyn WordView]) -> Result<Self> {
        let params = merge::common_params(sources)?;
        let engine = hash::resolve(params.hash_id())?;
        let words = (0..params.word_count())
            .map(|index| merge::merged_word(sources, index))
            .collect();
        Ok(Self::from_parts(
            params,
            engine,
            AtomicBitArray::from_words(words),
        ))
    }

    pub(crate) fn from_parts(
        params: FilterParams,
        engine: Arc<dyn HashEngine>,
        bits: AtomicBitArray,
    ) -> Self {
        debug_assert_eq!(bits.word_count(), params.word_count());
        Self {
            params,
            engine,
            bits,
            _items: PhantomData,
        }
    }

    /// Insert an item: set one bit in each of the `k` partitions.
    ///
    /// Lock-free; any number of threads may insert concurrently. The bits
    /// of one insert become visible individually, which concurrent queries
    /// tolerate (a partially visible insert reads as absent).
    pub fn insert(&self, item: &T) {
        let positions = self.positions(item);
        let m = self.params.partition_size();
        for (partition, &position) in positions.iter().enumerate() {
            self.bits.set((partition as u64 * m + position) as usize);
        }
    }

    /// Insert every item in a slice.
    pub fn insert_batch(&self, items: &[T]) {
        for item in items {
            self.insert(item);
        }
    }

    /// Probabilistic membership test.
    ///
    /// `false` is definitive; `true` is wrong with probability at most the
    /// filter's configured false positive rate while within capacity.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        let positions = self.positions(item);
        let m = self.params.partition_size();
        positions
            .iter()
            .enumerate()
            .all(|(partition, &position)| self.bits.get((partition as u64 * m + position) as usize))
    }

    /// Serialize to the wire format: `[hash_id, k, b]` followed by the
    /// words in reverse order, each big-endian.
    ///
    /// The encoding is a per-word-atomic snapshot and answers every read
    /// operation without being decoded first.
    #[must_use]
    pub fn encode(&self) -> EncodedFilter<T> {
        let mut bytes = Vec::with_capacity(self.params.encoded_len());
        bytes.push(self.params.hash_id());
        bytes.push(self.params.hash_count());
        bytes.push(self.params.partition_bits());
        for index in (0..self.params.word_count()).rev() {
            bytes.extend_from_slice(&self.bits.load_word(index).to_be_bytes());
        }
        EncodedFilter::from_trusted(bytes, self.params, Arc::clone(&self.engine))
    }

    /// OR all `sources` into this filter in place.
    ///
    /// Uses the same per-word CAS protocol as `insert`, so it is safe (and
    /// purely additive) under concurrent mutation of this filter. Every
    /// source must share this filter's `(hash_id, k, b)`; the check runs
    /// before any bit is touched, so a failed call changes nothing.
    ///
    /// # Errors
    ///
    /// [`BloomWireError::IncompatibleFilters`] on any parameter mismatch.
    pub fn merge_from(&self, sources: &[&dyn WordView]) -> Result<()> {
        for (index, source) in sources.iter().enumerate() {
            merge::ensure_compatible(self.params, source.params(), index)?;
        }
        for index in 0..self.params.word_count() {
            let bits = merge::merged_word(sources, index);
            if bits != 0 {
                self.bits.or_word(index, bits);
            }
        }
        Ok(())
    }

    #[inline]
    fn positions(&self, item: &T) -> Vec<u64> {
        let positions = self.engine.positions(
            hash::item_digest(item),
            self.params.hash_count(),
            self.params.partition_bits(),
        );
        debug_assert_eq!(positions.len(), self.params.hash_count() as usize);
        positions
    }
}

impl<T> PartitionedFilter<T> {
    /// Structural parameters `(hash_id, k, b)`.
    #[must_use]
    #[inline]
    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Identifier of the hash engine positioning items in this filter.
    #[must_use]
    #[inline]
    pub fn hash_id(&self) -> u8 {
        self.params.hash_id()
    }

    /// Number of hash functions (and partitions).
    #[must_use]
    #[inline]
    pub fn hash_count(&self) -> u8 {
        self.params.hash_count()
    }

    /// Partition width exponent `b`.
    #[must_use]
    #[inline]
    pub fn partition_bits(&self) -> u8 {
        self.params.partition_bits()
    }

    /// Bits per partition, `m = 2^b`.
    #[must_use]
    #[inline]
    pub fn partition_size(&self) -> u64 {
        self.params.partition_size()
    }

    /// Total 64-bit words backing the filter.
    #[must_use]
    #[inline]
    pub fn word_count(&self) -> usize {
        self.params.word_count()
    }

    /// Whether no bit has been set yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..self.params.word_count()).all(|index| self.bits.load_word(index) == 0)
    }

    /// Fraction of bits set, across all partitions, in `[0, 1]`.
    #[must_use]
    pub fn saturation(&self) -> f64 {
        let total = self.params.hash_count() as u64 * self.params.partition_size();
        self.bits.count_ones() as f64 / total as f64
    }

    /// Probability that a fresh item reads as present right now: the
    /// product of the per-partition fill fractions.
    #[must_use]
    pub fn estimated_fpp(&self) -> f64 {
        let m = self.params.partition_size() as f64;
        let per_partition = self.params.words_per_partition();
        (0..usize::from(self.params.hash_count()))
            .map(|partition| {
                let start = partition * per_partition;
                self.bits.count_ones_in_words(start..start + per_partition) as f64 / m
            })
            .product()
    }

    /// Estimate how many distinct items have been inserted.
    ///
    /// Scans the popcount of the last partition only — each partition is an
    /// independent single-hash Bloom filter, so one suffices and costs
    /// `1/k` of a full scan.
    #[must_use]
    pub fn estimate_size(&self) -> u64 {
        let per_partition = self.params.words_per_partition();
        let start = (usize::from(self.params.hash_count()) - 1) * per_partition;
        let set = self.bits.count_ones_in_words(start..start + per_partition);
        params::estimate_size_from_count(set, self.params.partition_size())
    }

    /// Number of insertions after which partitions are expected to reach
    /// 50% fill.
    #[must_use]
    pub fn estimate_capacity(&self) -> u64 {
        params::estimate_capacity_for(self.params.partition_size())
    }

    /// Bytes of mutable storage held by the word array.
    #[must_use]
    pub fn estimate_memory(&self) -> usize {
        self.params.word_count() * 8
    }
}

impl<T> WordView for PartitionedFilter<T> {
    fn params(&self) -> FilterParams {
        self.params
    }

    fn word(&self, index: usize) -> u64 {
        self.bits.load_word(index)
    }
}

impl<T> Clone for PartitionedFilter<T> {
    /// Copy the filter via a per-word atomic snapshot.
    fn clone(&self) -> Self {
        Self {
            params: self.params,
            engine: Arc::clone(&self.engine),
            bits: self.bits.clone(),
            _items: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PartitionedFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedFilter")
            .field("hash_id", &self.params.hash_id())
            .field("hash_count", &self.params.hash_count())
            .field("partition_bits", &self.params.partition_bits())
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}
