//! String interning for the compiler.
//!
//! Scene, outcome, record, and option names are interned so that name
//! comparison during binding is an O(1) integer comparison.

use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// An interned string identifier: a lightweight handle (u32) that can be
/// used to look up the actual string content.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Name(Spur);

impl Name {
    /// Create from a raw lasso key.
    #[inline]
    pub fn from_spur(spur: Spur) -> Self {
        Self(spur)
    }

    /// Get the raw lasso key.
    #[inline]
    pub fn as_spur(self) -> Spur {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.0)
    }
}

/// Thread-safe string interner.
///
/// Stores one copy of each unique string and returns lightweight
/// handles. The interner is shared (via `Arc`) between the tree builder,
/// the binder, and the lowering stage so handles stay comparable across
/// the whole pipeline.
#[derive(Clone)]
pub struct NameInterner {
    rodeo: Arc<ThreadedRodeo>,
}

impl NameInterner {
    pub fn new() -> Self {
        Self {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Intern a string, returning a handle to the interned value.
    /// If the string was already interned, returns the existing handle.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        Name::from_spur(self.rodeo.get_or_intern(s))
    }

    /// Look up an already-interned string without interning it if absent.
    #[inline]
    pub fn get(&self, s: &str) -> Option<Name> {
        self.rodeo.get(s).map(Name::from_spur)
    }

    /// Resolve an interned handle back to its string content.
    #[inline]
    pub fn resolve(&self, name: Name) -> &str {
        self.rodeo.resolve(&name.as_spur())
    }

    /// Returns the number of interned strings.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameInterner")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let interner = NameInterner::new();
        let a = interner.intern("ending");
        let b = interner.intern("ending");
        let c = interner.intern("intro");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "ending");
        assert_eq!(interner.resolve(c), "intro");
    }

    #[test]
    fn test_get() {
        let interner = NameInterner::new();
        assert!(interner.get("mood").is_none());
        let a = interner.intern("mood");
        assert_eq!(interner.get("mood"), Some(a));
    }
}
