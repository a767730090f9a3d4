//! Error types for bloomwire operations.
//!
//! Every fallible operation in the crate returns [`Result<T>`] with
//! [`BloomWireError`] as the error type. All variants are caller errors:
//! they are detected and reported before any filter state is modified, so a
//! failed call never leaves a filter partially updated.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BloomWireError>;

/// Errors that can occur during filter construction, merging, or decoding.
///
/// `Clone` + `PartialEq` enable error comparison in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BloomWireError {
    /// Construction parameters don't satisfy their constraints: capacity of
    /// zero, false positive probability outside `(0, 1)`, or a custom hash id
    /// outside `[0, 200]`.
    #[error("invalid filter parameters: {message}")]
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// The requested `(capacity, fpp)` pair would need partitions wider than
    /// 2^48 bits, which no hash engine tier supports.
    #[error("capacity requires 2^{required_bits}-bit partitions, above the 2^48 maximum")]
    UnsupportedCapacity {
        /// The partition width exponent the sizing math arrived at.
        required_bits: u32,
    },

    /// A hash id that is neither a built-in engine nor a registered custom
    /// engine. Ids 204..=255 are reserved and never resolve.
    #[error("unknown hash id {id}: no engine registered")]
    UnknownHashId {
        /// The unresolvable id.
        id: u8,
    },

    /// Merge inputs disagree on `(hash_id, k, b)`. Filters are only
    /// mergeable when they index the exact same bit space with the exact
    /// same hash engine.
    #[error("cannot merge incompatible filters: {reason}")]
    IncompatibleFilters {
        /// Description of the parameter mismatch.
        reason: String,
    },

    /// An encoded filter failed validation: truncated header, a length that
    /// doesn't match the declared parameters, or a partition width outside
    /// `[6, 48]`.
    #[error("malformed filter encoding: {reason}")]
    MalformedBinary {
        /// Description of what failed to parse.
        reason: String,
    },
}

impl BloomWireError {
    /// Create an `InvalidParameters` error with a formatted message.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create an `UnsupportedCapacity` error.
    #[must_use]
    pub fn unsupported_capacity(required_bits: u32) -> Self {
        Self::UnsupportedCapacity { required_bits }
    }

    /// Create an `UnknownHashId` error.
    #[must_use]
    pub fn unknown_hash_id(id: u8) -> Self {
        Self::UnknownHashId { id }
    }

    /// Create an `IncompatibleFilters` error.
    #[must_use]
    pub fn incompatible_filters(reason: impl Into<String>) -> Self {
        Self::IncompatibleFilters {
            reason: reason.into(),
        }
    }

    /// Create a `MalformedBinary` error.
    #[must_use]
    pub fn malformed_binary(reason: impl Into<String>) -> Self {
        Self::MalformedBinary {
            reason: reason.into(),
        }
    }
}
