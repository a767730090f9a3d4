//! The encoded (wire) representation.
//!
//! An [`EncodedFilter`] wraps the canonical binary form of a filter and
//! answers every read operation directly against the bytes, without
//! deserializing:
//!
//! ```text
//! offset 0: hash_id (1 byte)
//! offset 1: k       (1 byte)
//! offset 2: b       (1 byte)
//! offset 3: size words, 8 bytes each, big-endian,
//!           in REVERSE order: W_size, W_{size-1}, ..., W_1
//! ```
//!
//! where `size = k * 2^b / 64`, so the total length is `3 + k * 2^(b-3)`
//! bytes and the last 8 bytes are always the first live word. The reverse
//! word order keeps a logical bit's byte a single subtraction away from the
//! blob tail, independent of `size`.
//!
//! Encoded filters are immutable and freely shareable; a live filter and
//! its encoding answer every membership query identically.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::bits::AtomicBitArray;
use crate::core::params::{self, FilterParams, MAX_PARTITION_BITS, MIN_PARTITION_BITS};
use crate::error::{BloomWireError, Result};
use crate::filter::PartitionedFilter;
use crate::hash::{self, HashEngine};
use crate::merge::{self, WordView};

/// Validate a wire header and the blob length it implies.
pub(crate) fn parse_header(bytes: &[u8]) -> Result<FilterParams> {
    if bytes.len() < 3 {
        return Err(BloomWireError::malformed_binary(format!(
            "{} bytes is shorter than the 3-byte header",
            bytes.len()
        )));
    }
    let (hash_id, hash_count, partition_bits) = (bytes[0], bytes[1], bytes[2]);
    if hash_count == 0 {
        return Err(BloomWireError::malformed_binary(
            "hash count must be at least 1",
        ));
    }
    if !(MIN_PARTITION_BITS..=MAX_PARTITION_BITS).contains(&partition_bits) {
        return Err(BloomWireError::malformed_binary(format!(
            "partition width exponent {partition_bits} is outside \
             [{MIN_PARTITION_BITS}, {MAX_PARTITION_BITS}]"
        )));
    }
    // Length check in u64: a hostile header can imply sizes past usize.
    let expected = 3 + 8 * (u64::from(hash_count) << (partition_bits - MIN_PARTITION_BITS));
    if bytes.len() as u64 != expected {
        return Err(BloomWireError::malformed_binary(format!(
            "expected {expected} bytes for (k = {hash_count}, b = {partition_bits}), got {}",
            bytes.len()
        )));
    }
    Ok(FilterParams::from_raw(hash_id, hash_count, partition_bits))
}

/// Read the wire's reversed word stream back into live array order.
pub(crate) fn words_from_wire(bytes: &[u8], word_count: usize) -> Vec<u64> {
    let mut words = vec![0u64; word_count];
    for (offset, chunk) in bytes[3..].chunks_exact(8).enumerate() {
        words[word_count - 1 - offset] = u64::from_be_bytes(chunk.try_into().expect("8-byte chunk"));
    }
    words
}

/// An immutable, directly queryable encoded filter.
///
/// # Examples
///
/// ```
/// use bloomwire::{EncodedFilter, PartitionedFilter};
///
/// let live: PartitionedFilter<&str> = PartitionedFilter::new(1000, 0.02).unwrap();
/// live.insert(&"hello");
/// live.insert(&"world");
///
/// // Ship the bytes elsewhere...
/// let bytes = live.encode().into_bytes();
///
/// // ...and query them in place, no decode needed.
/// let blob: EncodedFilter<&str> = EncodedFilter::from_bytes(bytes).unwrap();
/// assert!(blob.contains(&"hello"));
/// assert!(blob.contains(&"world"));
/// assert!(!blob.contains(&"abcde"));
/// ```
pub struct EncodedFilter<T> {
    bytes: Vec<u8>,
    params: FilterParams,
    engine: Arc<dyn HashEngine>,
    _items: PhantomData<fn(&T)>,
}

impl<T> EncodedFilter<T> {
    /// Take ownership of wire bytes, validating the header, the length,
    /// and that the named hash engine is available.
    ///
    /// # Errors
    ///
    /// - [`BloomWireError::MalformedBinary`] on a truncated header, an
    ///   out-of-range `k` or `b`, or a length that contradicts them.
    /// - [`BloomWireError::UnknownHashId`] if the header names a custom
    ///   engine this process has not registered, or a reserved id.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let params = parse_header(&bytes)?;
        let engine = hash::resolve(params.hash_id())?;
        Ok(Self::from_trusted(bytes, params, engine))
    }

    pub(crate) fn from_trusted(
        bytes: Vec<u8>,
        params: FilterParams,
        engine: Arc<dyn HashEngine>,
    ) -> Self {
        debug_assert_eq!(bytes.len(), params.encoded_len());
        Self {
            bytes,
            params,
            engine,
            _items: PhantomData,
        }
    }

    /// The wire bytes.
    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the filter, returning the wire bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Structural parameters `(hash_id, k, b)`.
    #[must_use]
    #[inline]
    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Identifier of the hash engine recorded in the header.
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

    /// Estimate how many distinct items the filter holds, from the
    /// popcount of the final `m/8` bytes (one whole partition, contiguous
    /// at the blob tail).
    #[must_use]
    pub fn estimate_size(&self) -> u64 {
        let partition_bytes = (self.params.partition_size() / 8) as usize;
        let tail = &self.bytes[self.bytes.len() - partition_bytes..];
        let set = tail.iter().map(|byte| u64::from(byte.count_ones())).sum();
        params::estimate_size_from_count(set, self.params.partition_size())
    }

    /// Number of insertions after which partitions are expected to reach
    /// 50% fill.
    #[must_use]
    pub fn estimate_capacity(&self) -> u64 {
        params::estimate_capacity_for(self.params.partition_size())
    }

    /// Total byte length of the blob, header included.
    #[must_use]
    pub fn estimate_memory(&self) -> usize {
        self.bytes.len()
    }

    /// Test the logical bit at `position` within `partition`, straight
    /// from the bytes.
    #[inline]
    fn bit(&self, partition: u64, position: u64) -> bool {
        let linear = partition * self.params.partition_size() + position;
        let word = (linear / 64) as usize;
        let offset = (linear % 64) as usize;
        // Word `word` sits `word` slots from the blob tail; big-endian
        // within the word, so bit offset o lives in byte 7 - o/8.
        let byte = 3 + 8 * (self.params.word_count() - 1 - word) + (7 - offset / 8);
        self.bytes[byte] & (1u8 << (offset % 8)) != 0
    }
}

impl<T: Hash> EncodedFilter<T> {
    /// Probabilistic membership test against the raw bytes.
    ///
    /// Identical to querying the live filter this blob encodes.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        let positions = self.engine.positions(
            hash::item_digest(item),
            self.params.hash_count(),
            self.params.partition_bits(),
        );
        positions
            .iter()
            .enumerate()
            .all(|(partition, &position)| self.bit(partition as u64, position))
    }

    /// Rebuild the live filter this blob encodes.
    ///
    /// The result is bitwise equivalent: every read operation answers the
    /// same on the blob, the decoded filter, and the original.
    #[must_use]
    pub fn decode(&self) -> PartitionedFilter<T> {
        let words = words_from_wire(&self.bytes, self.params.word_count());
        PartitionedFilter::from_parts(
            self.params,
            Arc::clone(&self.engine),
            AtomicBitArray::from_words(words),
        )
    }

    /// Union of all `sources`, streamed straight into wire bytes.
    ///
    /// Byte-identical to merging into a live filter and encoding that, but
    /// without materializing the intermediate word array.
    ///
    /// # Errors
    ///
    /// Same contract as [`PartitionedFilter::merge`].
    pub fn merge(sources: &[&dyn WordView]) -> Result<Self> {
        let merged = merge::common_params(sources)?;
        let engine = hash::resolve(merged.hash_id())?;
        let mut bytes = Vec::with_capacity(merged.encoded_len());
        bytes.push(merged.hash_id());
        bytes.push(merged.hash_count());
        bytes.push(merged.partition_bits());
        for index in (0..merged.word_count()).rev() {
            bytes.extend_from_slice(&merge::merged_word(sources, index).to_be_bytes());
        }
        Ok(Self::from_trusted(bytes, merged, engine))
    }
}

impl<T> WordView for EncodedFilter<T> {
    fn params(&self) -> FilterParams {
        self.params
    }

    fn word(&self, index: usize) -> u64 {
        let start = 3 + 8 * (self.params.word_count() - 1 - index);
        u64::from_be_bytes(self.bytes[start..start + 8].try_into().expect("8-byte slice"))
    }
}

impl<T> Clone for EncodedFilter<T> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            params: self.params,
            engine: Arc::clone(&self.engine),
            _items: PhantomData,
        }
    }
}

/// Byte equality: two encodings are equal exactly when their wire bytes
/// are.
impl<T> PartialEq for EncodedFilter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for EncodedFilter<T> {}

impl<T> fmt::Debug for EncodedFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFilter")
            .field("hash_id", &self.params.hash_id())
            .field("hash_count", &self.params.hash_count())
            .field("partition_bits", &self.params.partition_bits())
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for EncodedFilter<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for EncodedFilter<T> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let bytes: Vec<u8> = serde::Deserialize::deserialize(deserializer)?;
        Self::from_bytes(bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            EncodedFilter::<u64>::from_bytes(vec![201, 1]),
            Err(BloomWireError::MalformedBinary { .. })
        ));
        assert!(matches!(
            EncodedFilter::<u64>::from_bytes(Vec::new()),
            Err(BloomWireError::MalformedBinary { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_header_fields() {
        // k = 0.
        let mut blob = vec![201, 0, 6];
        blob.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            EncodedFilter::<u64>::from_bytes(blob),
            Err(BloomWireError::MalformedBinary { .. })
        ));

        // b below the word-aligned floor, and above the widest engine.
        for b in [0u8, 5, 49, 255] {
            let mut blob = vec![201, 1, b];
            blob.extend_from_slice(&[0u8; 8]);
            assert!(
                matches!(
                    EncodedFilter::<u64>::from_bytes(blob),
                    Err(BloomWireError::MalformedBinary { .. })
                ),
                "b = {b} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        // Header claims k = 1, b = 6: exactly one word expected.
        for extra in [7usize, 9, 0, 16] {
            let mut blob = vec![201, 1, 6];
            blob.extend_from_slice(&vec![0u8; extra]);
            assert!(
                matches!(
                    EncodedFilter::<u64>::from_bytes(blob),
                    Err(BloomWireError::MalformedBinary { .. })
                ),
                "{extra} payload bytes should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unresolvable_hash_ids() {
        // Reserved id.
        let mut blob = vec![220, 1, 6];
        blob.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            EncodedFilter::<u64>::from_bytes(blob).unwrap_err(),
            BloomWireError::unknown_hash_id(220)
        );

        // Unregistered custom id.
        let mut blob = vec![150, 1, 6];
        blob.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            EncodedFilter::<u64>::from_bytes(blob).unwrap_err(),
            BloomWireError::unknown_hash_id(150)
        );
    }

    #[test]
    fn words_round_trip_through_the_wire_order() {
        let filter = PartitionedFilter::<u64>::new(1000, 0.01).unwrap();
        for i in 0..64u64 {
            filter.insert(&i);
        }
        let encoded = filter.encode();
        for index in 0..filter.word_count() {
            assert_eq!(
                WordView::word(&encoded, index),
                WordView::word(&filter, index),
                "word {index} disagrees between representations"
            );
        }
    }

    #[test]
    fn bit_addressing_matches_live_queries() {
        let filter = PartitionedFilter::<u64>::new(1000, 0.02).unwrap();
        for i in 0..200u64 {
            filter.insert(&i);
        }
        let encoded = filter.encode();
        for i in 0..400u64 {
            assert_eq!(
                encoded.contains(&i),
                filter.contains(&i),
                "representations disagree on {i}"
            );
        }
    }

    #[test]
    fn estimators_work_in_place() {
        let filter = PartitionedFilter::<u64>::new(1000, 0.01).unwrap();
        for i in 0..300u64 {
            filter.insert(&i);
        }
        let encoded = filter.encode();
        assert_eq!(encoded.estimate_capacity(), filter.estimate_capacity());
        assert_eq!(encoded.estimate_memory(), filter.estimate_memory() + 3);

        // The blob scans its tail partition, the live filter its last; the
        // partitions fill independently, so the estimates agree closely.
        let live = filter.estimate_size() as f64;
        let wire = encoded.estimate_size() as f64;
        assert!((live - wire).abs() <= live * 0.15 + 2.0, "{live} vs {wire}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let filter = PartitionedFilter::<u64>::new(100, 0.01).unwrap();
        filter.insert(&7);
        let encoded = filter.encode();

        let json = serde_json::to_string(&encoded).unwrap();
        let restored: EncodedFilter<u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoded);
        assert!(restored.contains(&7));
    }
}
