//! Fluent construction of live filters.

use std::hash::Hash;

use crate::error::{BloomWireError, Result};
use crate::filter::PartitionedFilter;

/// Builder for [`PartitionedFilter`].
///
/// `expected_items` and `false_positive_rate` are required; the hash engine
/// defaults to the built-in tier for the derived partition width unless a
/// custom id is supplied.
///
/// # Examples
///
/// ```
/// use bloomwire::builder::FilterBuilder;
/// use bloomwire::PartitionedFilter;
///
/// let filter: PartitionedFilter<&str> = FilterBuilder::new()
///     .expected_items(10_000)
///     .false_positive_rate(0.01)
///     .build()
///     .unwrap();
///
/// filter.insert(&"hello");
/// assert!(filter.contains(&"hello"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    expected_items: Option<usize>,
    fp_rate: Option<f64>,
    hash_id: Option<u8>,
}

impl FilterBuilder {
    /// Create a builder with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected number of items (required, must be > 0).
    #[must_use]
    pub fn expected_items(mut self, items: usize) -> Self {
        self.expected_items = Some(items);
        self
    }

    /// Set the target false positive probability (required, in `(0, 1)`).
    #[must_use]
    pub fn false_positive_rate(mut self, fp_rate: f64) -> Self {
        self.fp_rate = Some(fp_rate);
        self
    }

    /// Position items with a registered custom hash engine instead of the
    /// built-in tier.
    #[must_use]
    pub fn hash_id(mut self, hash_id: u8) -> Self {
        self.hash_id = Some(hash_id);
        self
    }

    /// Build the filter, validating all parameters.
    ///
    /// # Errors
    ///
    /// Everything [`PartitionedFilter::new`] and
    /// [`PartitionedFilter::with_hash_id`] can report, plus
    /// [`BloomWireError::InvalidParameters`] when a required parameter was
    /// never set.
    pub fn build<T: Hash>(self) -> Result<PartitionedFilter<T>> {
        let capacity = self.expected_items.ok_or_else(|| {
            BloomWireError::invalid_parameters("expected_items is required but was not set")
        })?;
        let fp_rate = self.fp_rate.ok_or_else(|| {
            BloomWireError::invalid_parameters("false_positive_rate is required but was not set")
        })?;
        match self.hash_id {
            Some(hash_id) => PartitionedFilter::with_hash_id(capacity, fp_rate, hash_id),
            None => PartitionedFilter::new(capacity, fp_rate),
        }
    }
}
