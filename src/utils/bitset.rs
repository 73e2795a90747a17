//! A fixed-length bit vector for dataflow set operations.
//!
//! Every fact set in the engine (reaching definitions, live variables,
//! available expressions, dominators, reaching copies, du-chains) is a
//! [`BitSet`] over a universe that is fixed when the set is created: the
//! `definitions` table, the interned names, the `expressions` table, the block
//! arena or the `du_chains` table.
//!
//! # Length discipline
//!
//! Binary operations require both operands to have the same length and
//! return [`crate::Error::InvariantViolation`] otherwise. A set built against
//! a stale universe must never be silently truncated into a fresh one.
//!
//! # Example
//!
//! ```rust
//! use tacflow::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! set.insert(0);
//! set.insert(50);
//! set.insert(99);
//!
//! assert!(set.contains(50));
//! assert_eq!(set.count(), 3);
//!
//! let other = BitSet::full(100);
//! let common = set.intersect(&other)?;
//! assert_eq!(common, set);
//!
//! assert!(set.union(&BitSet::new(10)).is_err());
//! # Ok::<(), tacflow::Error>(())
//! ```

use crate::Result;

/// A fixed-length bit vector with value semantics.
///
/// Cloning produces an independent set; the pure operations
/// ([`union`](Self::union), [`intersect`](Self::intersect),
/// [`difference`](Self::difference)) always return fresh sets, so a stored
/// fact is replaced rather than mutated behind another holder's back.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of bits in the set.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: vec![0; num_words],
            len: capacity,
        }
    }

    /// Creates a new bit set with all bits set.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Creates a bit set of the given length where every bit is `value`.
    #[must_use]
    pub fn with_value(capacity: usize, value: bool) -> Self {
        if value {
            Self::full(capacity)
        } else {
            Self::new(capacity)
        }
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bit set has no bits set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) {
        assert!(index < self.len, "index out of bounds");
        let word = index / 64;
        let bit = index % 64;
        self.words[word] |= 1u64 << bit;
    }

    /// Clears the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) {
        assert!(index < self.len, "index out of bounds");
        let word = index / 64;
        let bit = index % 64;
        self.words[word] &= !(1u64 << bit);
    }

    /// Returns `true` if the bit at the given index is set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        let word = index / 64;
        let bit = index % 64;
        (self.words[word] & (1u64 << bit)) != 0
    }

    /// Indexed read, returning an error instead of panicking on a bad index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `index >= self.len()`.
    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.len {
            return Err(invariant_error!(
                "bit index {} out of range for set of length {}",
                index,
                self.len
            ));
        }
        Ok(self.contains(index))
    }

    /// Indexed write, returning an error instead of panicking on a bad index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if `index >= self.len()`.
    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        if index >= self.len {
            return Err(invariant_error!(
                "bit index {} out of range for set of length {}",
                index,
                self.len
            ));
        }
        if value {
            self.insert(index);
        } else {
            self.remove(index);
        }
        Ok(())
    }

    /// Returns the number of bits set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// Sets all bits.
    pub fn fill(&mut self) {
        for word in &mut self.words {
            *word = u64::MAX;
        }
        // Clear excess bits in last word
        if !self.len.is_multiple_of(64) {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << (self.len % 64)) - 1;
            }
        }
    }

    fn check_len(&self, other: &Self) -> Result<()> {
        if self.len == other.len {
            Ok(())
        } else {
            Err(invariant_error!(
                "bit set length mismatch: {} vs {}",
                self.len,
                other.len
            ))
        }
    }

    /// Computes the union with another bit set (in place).
    ///
    /// Returns `true` if `self` changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn union_with(&mut self, other: &Self) -> Result<bool> {
        self.check_len(other)?;
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            let old = *a;
            *a |= *b;
            changed |= old != *a;
        }
        Ok(changed)
    }

    /// Computes the intersection with another bit set (in place).
    ///
    /// Returns `true` if `self` changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn intersect_with(&mut self, other: &Self) -> Result<bool> {
        self.check_len(other)?;
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            let old = *a;
            *a &= *b;
            changed |= old != *a;
        }
        Ok(changed)
    }

    /// Computes the difference with another bit set (in place).
    ///
    /// Removes all bits that are set in `other` from `self`.
    /// Returns `true` if `self` changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn difference_with(&mut self, other: &Self) -> Result<bool> {
        self.check_len(other)?;
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            let old = *a;
            *a &= !*b;
            changed |= old != *a;
        }
        Ok(changed)
    }

    /// Returns `self ∪ other` as a new set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn union(&self, other: &Self) -> Result<Self> {
        let mut result = self.clone();
        result.union_with(other)?;
        Ok(result)
    }

    /// Returns `self ∩ other` as a new set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn intersect(&self, other: &Self) -> Result<Self> {
        let mut result = self.clone();
        result.intersect_with(other)?;
        Ok(result)
    }

    /// Returns `self − other` as a new set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn difference(&self, other: &Self) -> Result<Self> {
        let mut result = self.clone();
        result.difference_with(other)?;
        Ok(result)
    }

    /// Returns `true` if every bit of `self` is also set in `other`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the lengths differ.
    pub fn is_subset(&self, other: &Self) -> Result<bool> {
        self.check_len(other)?;
        Ok(self
            .words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & !b == 0))
    }

    /// Returns an iterator over the indices of set bits.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            bit_idx: 0,
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for i in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{i}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

/// Iterator over the set bits in a `BitSet`.
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    bit_idx: usize,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word_idx < self.set.words.len() {
            let word = self.set.words[self.word_idx];
            while self.bit_idx < 64 {
                let idx = self.word_idx * 64 + self.bit_idx;
                if idx >= self.set.len {
                    return None;
                }
                self.bit_idx += 1;
                if (word & (1u64 << (self.bit_idx - 1))) != 0 {
                    return Some(idx);
                }
            }
            self.word_idx += 1;
            self.bit_idx = 0;
        }
        None
    }
}
