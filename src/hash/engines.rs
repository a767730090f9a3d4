//! Built-in double-hashing engines.
//!
//! Each tier draws just enough 32-bit base-hash material from the item
//! digest to cover its partition width, splits it into two indices `h1` and
//! `h2`, and expands them to `k` positions with the standard double-hashing
//! recurrence `(h1 + i*h2) mod m`. Kirsch & Mitzenmacher showed this
//! preserves the filter's false-positive behavior while hashing once (or
//! here, at most three times) per item.
//!
//! The base hashes for one item are drawn under distinct fixed seeds, which
//! keeps them independent; the seeds are part of the frozen definition of
//! ids 201..=203.

use xxhash_rust::xxh64::xxh64;

use super::HashEngine;

/// Seed for the first 32 bits of base-hash material.
const PRIMARY_SEED: u64 = 0x517c_c1b7_2722_0a95;

/// Seed for the second 32 bits.
const SECONDARY_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seed for the third 32 bits.
const TERTIARY_SEED: u64 = 0x2545_f491_4f6c_dd1d;

/// One 32-bit base hash of the digest, as the low half of a `u64`.
#[inline]
fn base32(digest: u64, seed: u64) -> u64 {
    xxh64(&digest.to_be_bytes(), seed) & 0xFFFF_FFFF
}

/// Expand `(h1, h2)` into `hash_count` positions in `[0, 2^partition_bits)`.
///
/// `h1` must already be below the partition size; `h2` may be any value up
/// to 48 bits wide (255 * 2^48 stays clear of `u64` overflow).
#[inline]
fn double_hash(h1: u64, h2: u64, hash_count: u8, partition_bits: u8) -> Vec<u64> {
    let mask = (1u64 << partition_bits) - 1;
    (0..u64::from(hash_count))
        .map(|i| (h1 + i * h2) & mask)
        .collect()
}

/// Engine 201: a single 32-bit base hash, partitions up to 2^16 bits.
///
/// The hash is read as a bitstring: `h1` is its top `b` bits, `h2` the
/// next `b`.
pub(crate) struct NarrowEngine;

impl HashEngine for NarrowEngine {
    fn positions(&self, digest: u64, hash_count: u8, partition_bits: u8) -> Vec<u64> {
        debug_assert!((6..=16).contains(&partition_bits));
        let base = base32(digest, PRIMARY_SEED);
        let h1 = base >> (32 - partition_bits);
        let h2 = (base >> (32 - 2 * partition_bits)) & ((1u64 << partition_bits) - 1);
        double_hash(h1, h2, hash_count, partition_bits)
    }

    fn name(&self) -> &'static str {
        "double-hash/narrow"
    }
}

/// Engine 202: two independent 32-bit base hashes, partitions up to 2^32
/// bits, each reduced mod `m` to form `h1` and `h2`.
pub(crate) struct WideEngine;

impl HashEngine for WideEngine {
    fn positions(&self, digest: u64, hash_count: u8, partition_bits: u8) -> Vec<u64> {
        debug_assert!((6..=32).contains(&partition_bits));
        let mask = (1u64 << partition_bits) - 1;
        let h1 = base32(digest, PRIMARY_SEED) & mask;
        let h2 = base32(digest, SECONDARY_SEED) & mask;
        double_hash(h1, h2, hash_count, partition_bits)
    }

    fn name(&self) -> &'static str {
        "double-hash/wide"
    }
}

/// Engine 203: three 32-bit base hashes concatenated big-endian into a
/// 96-bit string, partitions up to 2^48 bits.
///
/// `h1` is the top `b` bits of the concatenation and `h2` the next `b`, so
/// for `b > 32` both indices straddle the 32-bit seams of the individual
/// base hashes.
pub(crate) struct ExtendedEngine;

impl HashEngine for ExtendedEngine {
    fn positions(&self, digest: u64, hash_count: u8, partition_bits: u8) -> Vec<u64> {
        debug_assert!((6..=48).contains(&partition_bits));
        let acc = (base32(digest, PRIMARY_SEED) as u128) << 64
            | (base32(digest, SECONDARY_SEED) as u128) << 32
            | base32(digest, TERTIARY_SEED) as u128;
        let mask = (1u64 << partition_bits) - 1;
        let h1 = (acc >> (96 - partition_bits)) as u64 & mask;
        let h2 = (acc >> (96 - 2 * partition_bits)) as u64 & mask;
        double_hash(h1, h2, hash_count, partition_bits)
    }

    fn name(&self) -> &'static str {
        "double-hash/extended"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::item_digest;

    fn engines() -> [(&'static dyn HashEngine, u8); 3] {
        [
            (&NarrowEngine, 16),
            (&WideEngine, 32),
            (&ExtendedEngine, 48),
        ]
    }

    #[test]
    fn positions_stay_in_partition_range() {
        for (engine, max_bits) in engines() {
            for bits in [6u8, 11, max_bits] {
                let m = 1u64 << bits;
                for item in 0..64u64 {
                    let positions = engine.positions(item_digest(&item), 9, bits);
                    assert_eq!(positions.len(), 9, "{}", engine.name());
                    assert!(
                        positions.iter().all(|&p| p < m),
                        "{} produced a position outside [0, {m})",
                        engine.name()
                    );
                }
            }
        }
    }

    #[test]
    fn positions_follow_double_hash_recurrence() {
        for (engine, max_bits) in engines() {
            let m = 1u64 << max_bits;
            let positions = engine.positions(item_digest("recurrence"), 8, max_bits);
            let step = positions[1].wrapping_sub(positions[0]) & (m - 1);
            for (i, &p) in positions.iter().enumerate() {
                let expected = (positions[0] + i as u64 * step) & (m - 1);
                assert_eq!(p, expected, "{} step {i}", engine.name());
            }
        }
    }

    #[test]
    fn positions_are_deterministic() {
        for (engine, max_bits) in engines() {
            let digest = item_digest("stable");
            assert_eq!(
                engine.positions(digest, 12, max_bits),
                engine.positions(digest, 12, max_bits)
            );
        }
    }

    #[test]
    fn distinct_items_diverge() {
        for (engine, max_bits) in engines() {
            let a = engine.positions(item_digest("alpha"), 8, max_bits);
            let b = engine.positions(item_digest("beta"), 8, max_bits);
            assert_ne!(a, b, "{}", engine.name());
        }
    }

    #[test]
    fn narrow_engine_splits_base_hash_bits() {
        // With k = 1 only h1 is used, and h1 is the top b bits of the base
        // hash, so widening b by one bit can only append to the prefix.
        let digest = item_digest("prefix-check");
        let wide = NarrowEngine.positions(digest, 1, 12)[0];
        let narrow = NarrowEngine.positions(digest, 1, 11)[0];
        assert_eq!(wide >> 1, narrow);
    }

    #[test]
    fn extended_engine_covers_seam_widths() {
        // Widths straddling the 32/64-bit seams of the 96-bit concatenation.
        for bits in [33u8, 40, 47, 48] {
            let positions = ExtendedEngine.positions(item_digest("seam"), 16, bits);
            let m = 1u64 << bits;
            assert!(positions.iter().all(|&p| p < m), "b = {bits}");
            // Positions drawn from 2^33+ bit partitions should not all
            // collapse into 32-bit range for a healthy hash.
            assert!(
                positions.iter().any(|&p| p >= (1u64 << 32)),
                "b = {bits} produced suspiciously narrow positions"
            );
        }
    }
}
