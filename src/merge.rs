//! Merging filters across representations.
//!
//! Merge is bitwise OR over the packed words of filters that share the same
//! structural parameters. The inputs to a merge may mix live filters and
//! encoded blobs freely; [`WordView`] is the unifying abstraction, giving
//! indexed read access to a filter's words regardless of representation.
//!
//! The three merge shapes all live on the concrete types:
//!
//! - [`PartitionedFilter::merge`](crate::PartitionedFilter::merge) builds a
//!   fresh live filter.
//! - [`PartitionedFilter::merge_from`](crate::PartitionedFilter::merge_from)
//!   ORs into an existing live filter in place, safely under concurrent
//!   inserts.
//! - [`EncodedFilter::merge`](crate::EncodedFilter::merge) streams the OR
//!   straight into wire bytes without materializing a live intermediate.

use crate::core::params::FilterParams;
use crate::error::{BloomWireError, Result};

/// Indexed read access to a filter's packed words.
///
/// Implemented by the live filter (atomic word loads) and the encoded
/// filter (big-endian reads from the byte slice). Word `index` is in live
/// array order, `0..word_count`; both implementations agree on which
/// logical bits a word holds, so ORing word-by-word merges the filters.
pub trait WordView {
    /// Structural parameters `(hash_id, k, b)` of the viewed filter.
    fn params(&self) -> FilterParams;

    /// The 64-bit word at `index`, in live array order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= params().word_count()`.
    fn word(&self, index: usize) -> u64;
}

/// Validate that every source shares the same `(hash_id, k, b)` and return
/// those parameters. Errors on an empty source list: there is nothing to
/// take parameters from.
pub(crate) fn common_params(sources: &[&dyn WordView]) -> Result<FilterParams> {
    let first = sources
        .first()
        .ok_or_else(|| BloomWireError::invalid_parameters("merge requires at least one input"))?
        .params();
    for (index, source) in sources.iter().enumerate().skip(1) {
        ensure_compatible(first, source.params(), index)?;
    }
    Ok(first)
}

/// Check one source's parameters against the expected triple.
pub(crate) fn ensure_compatible(
    expected: FilterParams,
    actual: FilterParams,
    index: usize,
) -> Result<()> {
    if actual != expected {
        return Err(BloomWireError::incompatible_filters(format!(
            "input {index} has (hash_id, k, b) = ({}, {}, {}), expected ({}, {}, {})",
            actual.hash_id(),
            actual.hash_count(),
            actual.partition_bits(),
            expected.hash_id(),
            expected.hash_count(),
            expected.partition_bits(),
        )));
    }
    Ok(())
}

/// OR of every source's word at `index`.
#[inline]
pub(crate) fn merged_word(sources: &[&dyn WordView], index: usize) -> u64 {
    sources
        .iter()
        .fold(0u64, |acc, source| acc | source.word(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeView {
        params: FilterParams,
        words: Vec<u64>,
    }

    impl WordView for FakeView {
        fn params(&self) -> FilterParams {
            self.params
        }

        fn word(&self, index: usize) -> u64 {
            self.words[index]
        }
    }

    fn view(hash_id: u8, words: Vec<u64>) -> FakeView {
        FakeView {
            params: FilterParams::from_raw(hash_id, 1, 6),
            words,
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            common_params(&[]),
            Err(BloomWireError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn matching_params_pass() {
        let a = view(201, vec![1]);
        let b = view(201, vec![2]);
        let params = common_params(&[&a, &b]).unwrap();
        assert_eq!(params.hash_id(), 201);
    }

    #[test]
    fn mismatched_params_name_the_offender() {
        let a = view(201, vec![1]);
        let b = view(202, vec![2]);
        match common_params(&[&a, &b]) {
            Err(BloomWireError::IncompatibleFilters { reason }) => {
                assert!(reason.contains("input 1"), "{reason}");
            }
            other => panic!("expected IncompatibleFilters, got {other:?}"),
        }
    }

    #[test]
    fn merged_word_is_bitwise_or() {
        let a = view(201, vec![0b0011]);
        let b = view(201, vec![0b0101]);
        let c = view(201, vec![0b1000]);
        assert_eq!(merged_word(&[&a, &b, &c], 0), 0b1111);
    }
}
