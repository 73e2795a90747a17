//! Strongly-typed handles into the [`AnalysisState`](crate::ir::AnalysisState) arenas.
//!
//! Blocks and instructions are owned by arenas inside the state and refer to
//! each other only through these handles. A handle stays valid (and is never
//! reused) for the lifetime of the state, so bit sets indexed by a handle's
//! raw index survive unrelated insertions and removals.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Creates a new handle from a raw index value.
            ///
            /// Handles are normally obtained from the state; this constructor
            /// exists for indexing bit sets and for tests.
            #[must_use]
            #[inline]
            pub const fn new(index: usize) -> Self {
                $name(index)
            }

            /// Returns the raw index value of this handle.
            #[must_use]
            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Index of an interned name (variable, array base or label).
    NameId,
    "n"
);

define_id!(
    /// Handle of an instruction in the instruction arena.
    InstrId,
    "i"
);

define_id!(
    /// Handle of a basic block in the block arena.
    BlockId,
    "b"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_and_formatting() {
        let block = BlockId::new(7);
        assert_eq!(block.index(), 7);
        assert_eq!(format!("{block}"), "b7");
        assert_eq!(format!("{block:?}"), "BlockId(7)");
        assert_eq!(format!("{}", InstrId::new(3)), "i3");
        assert!(NameId::new(1) < NameId::new(2));
    }
}
