//! Utility types shared across the crate.

mod bitset;

pub use bitset::{BitSet, BitSetIter};
