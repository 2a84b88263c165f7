//! Syntax tree node definitions.
//!
//! A module is the root: a flat list of top-level declarations. Scene
//! bodies are statement lists; statements and expressions are closed
//! enums. "Missing" variants stand in for constructs the upstream parser
//! could not produce — they are already diagnosed and contribute nothing
//! downstream.

use crate::fraction::Fraction;
use skein_core::intern::Name;
use skein_core::text::TextSpan;

/// An identifier occurrence: an interned name plus where it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub name: Name,
    pub span: TextSpan,
}

/// The root of a story: every top-level declaration, in source order.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub declarations: Vec<Declaration>,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone)]
pub enum Declaration {
    Scene(SceneDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Interface(InterfaceDecl),
    Reference(ReferenceDecl),
    Outcome(OutcomeDecl),
    Spectrum(SpectrumDecl),
}

impl Declaration {
    /// The declared name.
    pub fn name(&self) -> &Identifier {
        match self {
            Declaration::Scene(d) => &d.name,
            Declaration::Record(d) => &d.name,
            Declaration::Enum(d) => &d.name,
            Declaration::Interface(d) => &d.name,
            Declaration::Reference(d) => &d.name,
            Declaration::Outcome(d) => &d.name,
            Declaration::Spectrum(d) => &d.name,
        }
    }

    pub fn span(&self) -> TextSpan {
        match self {
            Declaration::Scene(d) => d.span,
            Declaration::Record(d) => d.span,
            Declaration::Enum(d) => d.span,
            Declaration::Interface(d) => d.span,
            Declaration::Reference(d) => d.span,
            Declaration::Outcome(d) => d.span,
            Declaration::Spectrum(d) => d.span,
        }
    }
}

/// `scene <name> [chapter] { ... }`
#[derive(Debug, Clone)]
pub struct SceneDecl {
    pub name: Identifier,
    /// Chapters are the entry points of the story.
    pub is_chapter: bool,
    pub body: Vec<Statement>,
    pub span: TextSpan,
}

/// `record <name> { <property>: <type>, ... }`
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: Identifier,
    pub properties: Vec<PropertyDecl>,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: Identifier,
    pub ty: TypeName,
    pub span: TextSpan,
}

/// A type annotation on a record property or interface parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Text,
    Number,
    Flag,
    /// A record or enum, by name.
    Named(Identifier),
}

/// `enum <name> { <member>, ... }`
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Identifier,
    pub members: Vec<Identifier>,
    pub span: TextSpan,
}

/// `interface <name> { action m(...); choice m(...); }`
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Identifier,
    pub methods: Vec<MethodDecl>,
    pub span: TextSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Invoked from output statements.
    Action,
    /// Invoked as a switch option label.
    Choice,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: Identifier,
    pub kind: MethodKind,
    pub parameters: Vec<ParameterDecl>,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub name: Identifier,
    pub ty: TypeName,
    pub span: TextSpan,
}

/// `reference <name>: <interface>`
#[derive(Debug, Clone)]
pub struct ReferenceDecl {
    pub name: Identifier,
    pub interface: Identifier,
    pub span: TextSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// `outcome <name> { a, b, c } [default b] [public]`
#[derive(Debug, Clone)]
pub struct OutcomeDecl {
    pub name: Identifier,
    pub options: Vec<Identifier>,
    pub default: Option<Identifier>,
    pub visibility: Visibility,
    pub span: TextSpan,
}

/// `spectrum <name> { a 1/4, b 3/4 } [default a] [public]`
#[derive(Debug, Clone)]
pub struct SpectrumDecl {
    pub name: Identifier,
    pub options: Vec<SpectrumOptionDecl>,
    pub default: Option<Identifier>,
    pub visibility: Visibility,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct SpectrumOptionDecl {
    pub name: Identifier,
    /// The slice of the unit interval this option occupies.
    pub weight: Fraction,
    pub span: TextSpan,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum Statement {
    Output(OutputStatement),
    Switch(SwitchStatement),
    BranchOn(BranchOnStatement),
    Assign(AssignStatement),
    Run(RunStatement),
    /// Parser error placeholder; already diagnosed upstream.
    Missing(TextSpan),
}

impl Statement {
    pub fn span(&self) -> TextSpan {
        match self {
            Statement::Output(s) => s.span,
            Statement::Switch(s) => s.span,
            Statement::BranchOn(s) => s.span,
            Statement::Assign(s) => s.span,
            Statement::Run(s) => s.span,
            Statement::Missing(span) => *span,
        }
    }
}

/// Display or perform an expression: one step of the story.
#[derive(Debug, Clone)]
pub struct OutputStatement {
    pub expression: Expression,
    pub span: TextSpan,
}

/// A user choice: labeled options grouped into arms. An arm with
/// several labels presents each as its own option, all leading into the
/// one shared body.
#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub arms: Vec<SwitchArm>,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchArm {
    pub labels: Vec<Expression>,
    pub body: Vec<Statement>,
    pub span: TextSpan,
}

/// Dispatch on an outcome's currently assigned option.
#[derive(Debug, Clone)]
pub struct BranchOnStatement {
    pub target: Identifier,
    pub arms: Vec<BranchArm>,
    pub span: TextSpan,
}

/// One arm of a branch-on. A fallback (`other`) arm names no options.
#[derive(Debug, Clone)]
pub struct BranchArm {
    pub options: Vec<Identifier>,
    pub is_other: bool,
    pub body: Vec<Statement>,
    pub span: TextSpan,
}

/// `<outcome> = <option>` — a control-only side effect.
#[derive(Debug, Clone)]
pub struct AssignStatement {
    pub target: Identifier,
    pub option: Identifier,
    pub span: TextSpan,
}

/// Inline another scene by name.
#[derive(Debug, Clone)]
pub struct RunStatement {
    pub scene: Identifier,
    pub span: TextSpan,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub enum Expression {
    StringLiteral(StringLiteral),
    NumberLiteral(NumberLiteral),
    FlagLiteral(FlagLiteral),
    EnumMember(EnumMemberExpression),
    RecordCreation(RecordCreationExpression),
    Invoke(InvokeExpression),
    /// Parser error placeholder; already diagnosed upstream.
    Missing(TextSpan),
}

impl Expression {
    pub fn span(&self) -> TextSpan {
        match self {
            Expression::StringLiteral(e) => e.span,
            Expression::NumberLiteral(e) => e.span,
            Expression::FlagLiteral(e) => e.span,
            Expression::EnumMember(e) => e.span,
            Expression::RecordCreation(e) => e.span,
            Expression::Invoke(e) => e.span,
            Expression::Missing(span) => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringLiteral {
    pub value: String,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct NumberLiteral {
    pub value: i64,
    pub span: TextSpan,
}

#[derive(Debug, Clone)]
pub struct FlagLiteral {
    pub value: bool,
    pub span: TextSpan,
}

/// `<Enum>.<Member>`
#[derive(Debug, Clone)]
pub struct EnumMemberExpression {
    pub enum_name: Identifier,
    pub member: Identifier,
    pub span: TextSpan,
}

/// `<Record>(arg, prop: arg, ...)`
#[derive(Debug, Clone)]
pub struct RecordCreationExpression {
    pub record: Identifier,
    pub arguments: Vec<Argument>,
    pub span: TextSpan,
}

/// One record-creation argument, positional or named (never both).
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Option<Identifier>,
    pub value: Expression,
    pub span: TextSpan,
}

/// `<reference>.<method>(args...)`
#[derive(Debug, Clone)]
pub struct InvokeExpression {
    pub reference: Identifier,
    pub method: Identifier,
    pub arguments: Vec<Expression>,
    pub span: TextSpan,
}
