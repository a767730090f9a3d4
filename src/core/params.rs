//! Parameter sizing for partitioned Bloom filters.
//!
//! Given an expected capacity `n` and a target false positive probability
//! `p`, this module derives the two structural parameters of a filter:
//!
//! - `k`, the hash count, which is also the number of partitions:
//!   `k = ceil(-log2(p))`.
//! - `b`, the partition width exponent, so each partition holds `m = 2^b`
//!   bits. The per-partition target `p' = p^(1/k)` is plugged into the
//!   fill-ratio relation `p' = 1 - (1 - 1/m)^n` and solved for `m`, then
//!   rounded up to the next power of two.
//!
//! The floor `b >= 6` keeps every partition a whole number of 64-bit words;
//! the ceiling `b <= 48` is the widest partition any built-in hash engine
//! can index.
//!
//! # References
//!
//! - Almeida, Baquero, Preguiça, Hutchison (2007). "Scalable Bloom Filters"
//! - Kirsch & Mitzenmacher (2006). "Less Hashing, Same Performance"

use crate::error::{BloomWireError, Result};
use crate::hash::{EXTENDED_HASH_ID, NARROW_HASH_ID, WIDE_HASH_ID};

/// Smallest supported partition width exponent.
///
/// `2^6 = 64` bits is one word, so `k * m` is always a multiple of 64.
pub const MIN_PARTITION_BITS: u8 = 6;

/// Largest supported partition width exponent.
///
/// The widest built-in hash engine derives 96 bits of position material per
/// item, enough for two 48-bit indices.
pub const MAX_PARTITION_BITS: u8 = 48;

/// Structural parameters of a filter: `(hash_id, k, b)`.
///
/// These three bytes fully determine the bit layout of a filter and are the
/// compatibility key for merging: two filters can be merged only when their
/// `FilterParams` are identical. They are also the wire-format header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    hash_id: u8,
    hash_count: u8,
    partition_bits: u8,
}

impl FilterParams {
    /// Derive parameters for an expected `capacity` and target false
    /// positive probability `fpp`, selecting the default hash engine for
    /// the resulting partition width.
    ///
    /// # Errors
    ///
    /// - [`BloomWireError::InvalidParameters`] if `capacity == 0` or `fpp`
    ///   is outside `(0, 1)`.
    /// - [`BloomWireError::UnsupportedCapacity`] if the solved partition
    ///   width exceeds `2^48` bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloomwire::core::params::FilterParams;
    ///
    /// let params = FilterParams::derive(1000, 0.01).unwrap();
    /// assert_eq!(params.hash_count(), 7);
    /// assert_eq!(params.partition_bits(), 11);
    /// ```
    pub fn derive(capacity: usize, fpp: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(BloomWireError::invalid_parameters(
                "expected capacity must be greater than 0",
            ));
        }
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(BloomWireError::invalid_parameters(format!(
                "false positive probability {fpp} is outside (0, 1)"
            )));
        }

        let hash_count = (-fpp.log2()).ceil();
        if hash_count > 255.0 {
            return Err(BloomWireError::invalid_parameters(format!(
                "false positive probability {fpp} would need {hash_count} hash functions (max 255)"
            )));
        }
        let hash_count = hash_count as u8;

        // Per-partition target, solved for m in p' = 1 - (1 - 1/m)^n.
        let per_partition = fpp.powf(1.0 / f64::from(hash_count));
        let n = capacity as f64;
        let m_real = 1.0 / (1.0 - (1.0 - per_partition).powf(1.0 / n));

        let required = m_real.log2().ceil();
        let partition_bits = required.max(f64::from(MIN_PARTITION_BITS));
        if !(partition_bits <= f64::from(MAX_PARTITION_BITS)) {
            // Saturating cast reports u32::MAX when the solve overflowed.
            return Err(BloomWireError::unsupported_capacity(required as u32));
        }
        let partition_bits = partition_bits as u8;

        Ok(Self {
            hash_id: default_hash_id(partition_bits),
            hash_count,
            partition_bits,
        })
    }

    /// Assemble parameters from raw header fields. Callers are responsible
    /// for range validation.
    pub(crate) const fn from_raw(hash_id: u8, hash_count: u8, partition_bits: u8) -> Self {
        Self {
            hash_id,
            hash_count,
            partition_bits,
        }
    }

    /// Replace the hash id, keeping the derived `(k, b)`.
    pub(crate) const fn with_hash_id(self, hash_id: u8) -> Self {
        Self {
            hash_id,
            hash_count: self.hash_count,
            partition_bits: self.partition_bits,
        }
    }

    /// Identifier of the hash engine the filter was built with.
    #[must_use]
    #[inline]
    pub const fn hash_id(&self) -> u8 {
        self.hash_id
    }

    /// Number of hash functions, which is also the number of partitions.
    #[must_use]
    #[inline]
    pub const fn hash_count(&self) -> u8 {
        self.hash_count
    }

    /// Partition width exponent `b`; each partition holds `2^b` bits.
    #[must_use]
    #[inline]
    pub const fn partition_bits(&self) -> u8 {
        self.partition_bits
    }

    /// Bits per partition, `m = 2^b`.
    #[must_use]
    #[inline]
    pub const fn partition_size(&self) -> u64 {
        1u64 << self.partition_bits
    }

    /// 64-bit words per partition, `m / 64`.
    #[must_use]
    #[inline]
    pub const fn words_per_partition(&self) -> usize {
        1usize << (self.partition_bits - MIN_PARTITION_BITS)
    }

    /// Total 64-bit words backing the filter, `k * m / 64`.
    #[must_use]
    #[inline]
    pub const fn word_count(&self) -> usize {
        self.hash_count as usize * self.words_per_partition()
    }

    /// Exact byte length of this filter's encoded form: a 3-byte header
    /// followed by the packed words.
    #[must_use]
    #[inline]
    pub const fn encoded_len(&self) -> usize {
        3 + 8 * self.word_count()
    }
}

/// Default hash engine for a partition width: the narrowest tier whose
/// position material covers `b` bits.
const fn default_hash_id(partition_bits: u8) -> u8 {
    if partition_bits <= 16 {
        NARROW_HASH_ID
    } else if partition_bits <= 32 {
        WIDE_HASH_ID
    } else {
        EXTENDED_HASH_ID
    }
}

/// Cardinality estimate from the popcount of a single partition.
///
/// A partition is an independent `m`-bit Bloom filter with one hash, so the
/// expected fill after `n` insertions is `m * (1 - (1 - 1/m)^n)`; inverting
/// gives `n ~= -m * ln(1 - x/m)` for `x` set bits. A saturated partition
/// reports `round(m * ln(m))` rather than dividing by zero.
pub(crate) fn estimate_size_from_count(set_bits: u64, partition_size: u64) -> u64 {
    let m = partition_size as f64;
    if set_bits >= partition_size {
        (m * m.ln()).round() as u64
    } else {
        let x = set_bits as f64;
        (-m * (1.0 - x / m).ln()).round() as u64
    }
}

/// Number of insertions after which a partition is expected to reach 50%
/// fill: `round(ln(0.5) / ln(1 - 1/m))`.
pub(crate) fn estimate_capacity_for(partition_size: u64) -> u64 {
    let m = partition_size as f64;
    (f64::ln(0.5) / (1.0 - 1.0 / m).ln()).round() as u64
}
