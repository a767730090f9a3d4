//! Core building blocks: parameter sizing and atomic bit storage.

pub mod bits;
pub mod params;

pub use bits::AtomicBitArray;
pub use params::{FilterParams, MAX_PARTITION_BITS, MIN_PARTITION_BITS};
