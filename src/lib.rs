//! bloomwire: a concurrent partitioned Bloom filter with a directly
//! queryable binary encoding.
//!
//! A [`PartitionedFilter`] answers approximate set-membership queries with
//! zero false negatives and a false positive rate chosen at construction.
//! The bit array is split into `k` partitions, one per hash function, and
//! all mutation is lock-free: any number of threads can insert and query
//! through a shared `&self` with no external locking.
//!
//! Its wire format ([`EncodedFilter`]) is bit-exact and queryable in
//! place — membership tests, size estimation, and merging all run directly
//! against the encoded bytes, so a blob pulled off the network never needs
//! to be deserialized just to be consulted.
//!
//! # Quick start
//!
//! ```
//! use bloomwire::PartitionedFilter;
//!
//! let filter: PartitionedFilter<&str> = PartitionedFilter::new(10_000, 0.01).unwrap();
//! filter.insert(&"hello");
//! filter.insert(&"world");
//!
//! assert!(filter.contains(&"hello"));       // definitely inserted
//! assert!(!filter.contains(&"goodbye"));    // definitely not
//! ```
//!
//! # Representations
//!
//! | Representation | Mutability | Queries | Storage |
//! |---|---|---|---|
//! | [`PartitionedFilter`] | lock-free inserts | atomic loads | `k * 2^b / 8` bytes |
//! | [`EncodedFilter`] | immutable | in-place byte reads | the same + 3-byte header |
//!
//! `encode` and `decode` convert between them; a filter and its encoding
//! answer every read operation identically. Merging accepts any mix of the
//! two through the [`WordView`] trait:
//!
//! ```
//! use bloomwire::{PartitionedFilter, WordView};
//!
//! let a = PartitionedFilter::<&str>::new(1000, 0.05).unwrap();
//! let b = PartitionedFilter::<&str>::new(1000, 0.05).unwrap();
//! a.insert(&"hello");
//! b.insert(&"world");
//!
//! let encoded_b = b.encode();
//! let sources: Vec<&dyn WordView> = vec![&a, &encoded_b];
//! let merged = PartitionedFilter::merge(&sources).unwrap();
//!
//! assert!(merged.contains(&"hello"));
//! assert!(merged.contains(&"world"));
//! ```
//!
//! # Hash engines
//!
//! Items are positioned by a [`hash::HashEngine`] identified by a
//! single-byte id that travels in the wire format. Three frozen built-in
//! engines cover partition widths up to 2^48 bits; ids `0..=200` are open
//! for custom engines via [`hash::register`]. See the [`hash`] module.
//!
//! # Feature flags
//!
//! | Feature | Enables |
//! |---|---|
//! | `serde` | `Serialize`/`Deserialize` for [`EncodedFilter`] |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod core;
pub mod encoded;
pub mod error;
pub mod filter;
pub mod hash;
pub mod merge;

pub use builder::FilterBuilder;
pub use encoded::EncodedFilter;
pub use error::{BloomWireError, Result};
pub use filter::PartitionedFilter;
pub use merge::WordView;

/// Convenient imports for typical use.
///
/// ```
/// use bloomwire::prelude::*;
///
/// let filter: PartitionedFilter<u64> = PartitionedFilter::new(1000, 0.01).unwrap();
/// filter.insert(&7);
/// assert!(filter.contains(&7));
/// ```
pub mod prelude {
    pub use crate::builder::FilterBuilder;
    pub use crate::encoded::EncodedFilter;
    pub use crate::error::{BloomWireError, Result};
    pub use crate::filter::PartitionedFilter;
    pub use crate::hash::HashEngine;
    pub use crate::merge::WordView;
}
