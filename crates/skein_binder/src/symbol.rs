//! Symbol and symbol table definitions.

use rustc_hash::FxHashMap;
use skein_ast::fraction::Fraction;
use skein_ast::node::MethodKind;
use skein_ast::types::{OutcomeFlags, SymbolId};
use skein_core::intern::Name;
use skein_core::text::TextSpan;

/// The resolved type of a record property or interface parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedType {
    Text,
    Number,
    Flag,
    Record(SymbolId),
    Enum(SymbolId),
    /// Placeholder after a resolution failure; compatible with anything.
    Error,
}

impl ResolvedType {
    /// Whether a value of type `other` is acceptable where `self` is
    /// expected. Error placeholders never cascade into further errors.
    pub fn accepts(&self, other: &ResolvedType) -> bool {
        matches!(self, ResolvedType::Error)
            || matches!(other, ResolvedType::Error)
            || self == other
    }
}

/// A typed field of a record declaration.
#[derive(Debug, Clone)]
pub struct PropertySymbol {
    pub name: Name,
    pub ty: ResolvedType,
    pub span: TextSpan,
}

/// One method of an interface contract.
#[derive(Debug, Clone)]
pub struct InterfaceMethodSymbol {
    pub name: Name,
    pub kind: MethodKind,
    pub parameters: Vec<ResolvedType>,
    pub span: TextSpan,
}

/// One slice of a spectrum's unit-interval partition. Intervals are
/// contiguous: each starts where the previous one ended.
#[derive(Debug, Clone)]
pub struct SpectrumInterval {
    /// Index of the option this interval selects.
    pub option: u32,
    /// Cumulative upper bound of the interval.
    pub upper: Fraction,
    /// Whether the upper bound itself belongs to the interval. True
    /// only for the final interval, which closes the partition at 1.
    pub inclusive: bool,
}

#[derive(Debug, Clone)]
pub struct SceneSymbol {
    pub is_chapter: bool,
}

#[derive(Debug, Clone)]
pub struct RecordSymbol {
    pub properties: Vec<PropertySymbol>,
}

#[derive(Debug, Clone)]
pub struct EnumSymbol {
    pub members: Vec<Name>,
}

#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub methods: Vec<InterfaceMethodSymbol>,
}

#[derive(Debug, Clone)]
pub struct ReferenceSymbol {
    /// The interface this reference is bound to.
    pub interface: SymbolId,
}

/// An outcome, or a spectrum when [`OutcomeFlags::SPECTRUM`] is set and
/// `intervals` partitions the unit interval over the options.
#[derive(Debug, Clone)]
pub struct OutcomeSymbol {
    pub options: Vec<Name>,
    /// Index into `options`, if a default was declared.
    pub default: Option<u32>,
    pub flags: OutcomeFlags,
    pub intervals: Option<Vec<SpectrumInterval>>,
}

impl OutcomeSymbol {
    pub fn option_index(&self, name: Name) -> Option<u32> {
        self.options.iter().position(|&o| o == name).map(|i| i as u32)
    }

    pub fn is_spectrum(&self) -> bool {
        self.flags.contains(OutcomeFlags::SPECTRUM)
    }
}

/// What a symbol declares.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Scene(SceneSymbol),
    Record(RecordSymbol),
    Enum(EnumSymbol),
    Interface(InterfaceSymbol),
    Reference(ReferenceSymbol),
    Outcome(OutcomeSymbol),
    /// Recovery placeholder standing in for an undeclarable name.
    Error,
}

/// A named top-level declaration. The id doubles as the declaration
/// order index, which later stages use as their deterministic ordering.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: Name,
    pub kind: SymbolKind,
    pub span: TextSpan,
}

impl Symbol {
    pub fn as_scene(&self) -> Option<&SceneSymbol> {
        match &self.kind {
            SymbolKind::Scene(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordSymbol> {
        match &self.kind {
            SymbolKind::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumSymbol> {
        match &self.kind {
            SymbolKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceSymbol> {
        match &self.kind {
            SymbolKind::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceSymbol> {
        match &self.kind {
            SymbolKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_outcome(&self) -> Option<&OutcomeSymbol> {
        match &self.kind {
            SymbolKind::Outcome(o) => Some(o),
            _ => None,
        }
    }
}

/// The single global table every name in a story resolves against.
/// Symbols are stored in declaration order; lookup is by interned name.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: FxHashMap<Name, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new symbol. The caller has already checked for
    /// duplicates; a repeated name would silently shadow here.
    pub(crate) fn declare(&mut self, name: Name, kind: SymbolKind, span: TextSpan) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { id, name, kind, span });
        self.by_name.insert(name, id);
        id
    }

    pub fn resolve(&self, name: Name) -> Option<SymbolId> {
        self.by_name.get(&name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All scene symbols, in declaration order.
    pub fn scenes(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .iter()
            .filter(|s| matches!(s.kind, SymbolKind::Scene(_)))
    }

    /// All outcome/spectrum symbols, in declaration order.
    pub fn outcomes(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .iter()
            .filter(|s| matches!(s.kind, SymbolKind::Outcome(_)))
    }
}
