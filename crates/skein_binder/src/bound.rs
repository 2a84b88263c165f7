//! The bound tree: syntax augmented with resolved symbols.
//!
//! Identifiers are gone; every node carries the `SymbolId`s and option
//! indices the binder resolved. Missing statements from the parser are
//! dropped during binding, so the bound tree is the exact input the flow
//! graph builder translates.

use skein_ast::types::SymbolId;
use skein_core::text::TextSpan;

/// A scene with its bound body and its run-dependency edges.
#[derive(Debug, Clone)]
pub struct BoundScene {
    pub symbol: SymbolId,
    pub body: Vec<BoundStatement>,
    /// Scenes this scene runs, deduplicated, in first-run order.
    pub runs: Vec<SymbolId>,
}

/// Every scene of the story, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BoundModule {
    pub scenes: Vec<BoundScene>,
}

impl BoundModule {
    pub fn scene(&self, symbol: SymbolId) -> Option<&BoundScene> {
        self.scenes.iter().find(|s| s.symbol == symbol)
    }
}

#[derive(Debug, Clone)]
pub enum BoundStatement {
    Output(BoundOutput),
    Switch(BoundSwitch),
    BranchOn(BoundBranchOn),
    Assign(BoundAssign),
    Run(BoundRun),
}

#[derive(Debug, Clone)]
pub struct BoundOutput {
    pub expression: BoundExpression,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct BoundSwitch {
    pub arms: Vec<BoundSwitchArm>,
    pub span: TextSpan,
}

/// One switch arm: every label is its own presented option, all wired
/// into the shared body.
#[derive(Debug, Clone)]
pub struct BoundSwitchArm {
    pub labels: Vec<BoundExpression>,
    pub body: Vec<BoundStatement>,
}

/// A validated branch-on. `dispatch[i]` names the arm that handles the
/// outcome's declared option `i`; coverage was checked by the binder, so
/// every option maps to exactly one arm.
#[derive(Debug, Clone)]
pub struct BoundBranchOn {
    pub outcome: SymbolId,
    pub arms: Vec<Vec<BoundStatement>>,
    pub dispatch: Vec<u32>,
    pub span: TextSpan,
}

/// Write `option` into the outcome's register. Control-only.
#[derive(Debug, Clone)]
pub struct BoundAssign {
    pub outcome: SymbolId,
    pub option: u32,
    pub span: TextSpan,
}

/// Inline the named scene at this point.
#[derive(Debug, Clone)]
pub struct BoundRun {
    pub scene: SymbolId,
    pub span: TextSpan,
}

/// A fully resolved expression. Record fields are in declared property
/// order regardless of how the arguments were written.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpression {
    Text(String),
    Number(i64),
    Flag(bool),
    EnumMember {
        enum_symbol: SymbolId,
        member: u32,
    },
    Record {
        record: SymbolId,
        fields: Vec<BoundExpression>,
    },
    Invoke {
        reference: SymbolId,
        method: u32,
        arguments: Vec<BoundExpression>,
    },
    /// Stands in for an expression that failed to bind. Only ever
    /// present alongside an error diagnostic, so it never reaches a
    /// lowered artifact.
    Error,
}
