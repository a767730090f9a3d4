//! Hash engines and the id registry.
//!
//! A filter never hashes items directly. Items enter through
//! [`std::hash::Hash`], are reduced to a stable 64-bit digest by
//! [`item_digest`], and a [`HashEngine`] turns that digest into the `k`
//! partition positions. Which engine a filter uses is recorded as a
//! single-byte id that travels in the wire format, so decoding a blob on
//! another machine reproduces the exact same positions.
//!
//! # Id space
//!
//! | Range      | Meaning                                       |
//! |------------|-----------------------------------------------|
//! | `0..=200`  | Custom engines, installed via [`register`]    |
//! | `201..=203`| Built-in double-hashing tiers (frozen)        |
//! | `204..=255`| Reserved; never resolve                       |
//!
//! The three built-in tiers differ only in how much base-hash material they
//! draw per item: one 32-bit hash covers partitions up to 2^16 bits, two
//! cover 2^32, and three concatenated cover 2^48. All of them combine the
//! material by double hashing, `position_i = (h1 + i*h2) mod m`.
//!
//! Because the id is persisted, the output of ids 201..=203 is frozen: any
//! change to an engine's position function must ship under a new id.
//!
//! # Stability
//!
//! Digests use `xxhash` with fixed seeds rather than `std`'s `DefaultHasher`
//! so that positions agree across processes, platforms, and crate versions.
//! The digest of an item is stable as long as the item's `Hash`
//! implementation is.

mod engines;
mod registry;

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh64::Xxh64;

pub use registry::{register, resolve};

/// Id of the built-in engine for partitions up to 2^16 bits.
pub const NARROW_HASH_ID: u8 = 201;

/// Id of the built-in engine for partitions up to 2^32 bits.
pub const WIDE_HASH_ID: u8 = 202;

/// Id of the built-in engine for partitions up to 2^48 bits.
pub const EXTENDED_HASH_ID: u8 = 203;

/// Largest id available to custom engines.
pub const MAX_CUSTOM_HASH_ID: u8 = 200;

/// Seed for the item digest. Distinct from every engine base-hash seed.
const DIGEST_SEED: u64 = 0;

/// A hash engine: digest in, partition positions out.
///
/// Implementations must be pure functions of `(digest, hash_count,
/// partition_bits)` — the same inputs must yield the same positions in every
/// process, forever, because positions are baked into encoded filters under
/// the engine's registered id.
///
/// # Examples
///
/// A custom engine that spreads positions with a multiplicative step:
///
/// ```
/// use bloomwire::hash::HashEngine;
///
/// struct OddStride;
///
/// impl HashEngine for OddStride {
///     fn positions(&self, digest: u64, hash_count: u8, partition_bits: u8) -> Vec<u64> {
///         let mask = (1u64 << partition_bits) - 1;
///         let step = digest | 1;
///         (0..u64::from(hash_count))
///             .map(|i| digest.wrapping_add(i.wrapping_mul(step)) & mask)
///             .collect()
///     }
///
///     fn name(&self) -> &'static str {
///         "odd-stride"
///     }
/// }
/// ```
pub trait HashEngine: Send + Sync {
    /// Derive the partition positions for an item digest.
    ///
    /// Returns exactly `hash_count` positions, the `j`-th addressing a bit
    /// inside partition `j`; every position must lie in
    /// `[0, 2^partition_bits)`.
    fn positions(&self, digest: u64, hash_count: u8, partition_bits: u8) -> Vec<u64>;

    /// Engine name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Reduce an item to the stable 64-bit digest all engines consume.
#[must_use]
pub fn item_digest<T: Hash + ?Sized>(item: &T) -> u64 {
    let mut hasher = Xxh64::new(DIGEST_SEED);
    item.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(item_digest("hello"), item_digest("hello"));
        assert_eq!(item_digest(&12345u64), item_digest(&12345u64));
    }

    #[test]
    fn digest_separates_nearby_items() {
        assert_ne!(item_digest("hello"), item_digest("hellp"));
        assert_ne!(item_digest(&1u64), item_digest(&2u64));
    }

    #[test]
    fn digest_accepts_unsized_items() {
        let owned = String::from("key");
        let slice: &str = &owned;
        // &String and &str hash identically, so either spelling works.
        assert_eq!(item_digest(&owned), item_digest(slice));
    }
}
