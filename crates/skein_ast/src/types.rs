//! Id newtypes and flag sets shared across the pipeline.

use std::fmt;

bitflags::bitflags! {
    /// Flags on an outcome or spectrum symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutcomeFlags: u8 {
        const NONE            = 0;
        /// The outcome is visible to the host of the generated machine.
        const PUBLIC          = 1 << 0;
        /// Every read site is dominated by an assignment, or a default
        /// option exists. Set by the binder's assignment analysis.
        const ALWAYS_ASSIGNED = 1 << 1;
        /// The symbol is a spectrum (its options carry intervals).
        const SPECTRUM        = 1 << 2;
    }
}

/// A lightweight handle to a symbol in the symbol table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const INVALID: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}
