//! skein_nodebuilder: programmatic syntax tree construction.
//!
//! The parser is an external collaborator; in-memory hosts and the test
//! suites build their trees through this factory instead. Every node
//! gets a distinct synthetic span, so diagnostics stay ordered and
//! declarations stay distinguishable exactly as they would be for
//! parsed source.

use skein_ast::fraction::Fraction;
use skein_ast::node::*;
use skein_core::intern::NameInterner;
use skein_core::text::TextSpan;
use std::cell::{Cell, RefCell};

/// Builds one [`Module`]. Methods take `&self` so calls nest freely.
pub struct StoryBuilder {
    interner: NameInterner,
    declarations: RefCell<Vec<Declaration>>,
    next_pos: Cell<u32>,
}

impl StoryBuilder {
    pub fn new() -> Self {
        Self {
            interner: NameInterner::new(),
            declarations: RefCell::new(Vec::new()),
            next_pos: Cell::new(0),
        }
    }

    /// Hand the finished module over, along with the interner that can
    /// resolve its names.
    pub fn finish(self) -> (Module, NameInterner) {
        (
            Module {
                declarations: self.declarations.into_inner(),
            },
            self.interner,
        )
    }

    fn span(&self) -> TextSpan {
        let start = self.next_pos.get();
        self.next_pos.set(start + 1);
        TextSpan::new(start, 1)
    }

    pub fn ident(&self, name: &str) -> Identifier {
        Identifier {
            name: self.interner.intern(name),
            span: self.span(),
        }
    }

    /// A named record or enum type.
    pub fn named_type(&self, name: &str) -> TypeName {
        TypeName::Named(self.ident(name))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn scene(&self, name: &str, body: Vec<Statement>) -> &Self {
        let decl = SceneDecl {
            name: self.ident(name),
            is_chapter: false,
            body,
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Scene(decl));
        self
    }

    pub fn chapter(&self, name: &str, body: Vec<Statement>) -> &Self {
        let decl = SceneDecl {
            name: self.ident(name),
            is_chapter: true,
            body,
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Scene(decl));
        self
    }

    pub fn record(&self, name: &str, properties: Vec<(&str, TypeName)>) -> &Self {
        let decl = RecordDecl {
            name: self.ident(name),
            properties: properties
                .into_iter()
                .map(|(property, ty)| PropertyDecl {
                    name: self.ident(property),
                    ty,
                    span: self.span(),
                })
                .collect(),
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Record(decl));
        self
    }

    pub fn enumeration(&self, name: &str, members: &[&str]) -> &Self {
        let decl = EnumDecl {
            name: self.ident(name),
            members: members.iter().map(|m| self.ident(m)).collect(),
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Enum(decl));
        self
    }

    pub fn interface(&self, name: &str, methods: Vec<MethodDecl>) -> &Self {
        let decl = InterfaceDecl {
            name: self.ident(name),
            methods,
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Interface(decl));
        self
    }

    pub fn action(&self, name: &str, parameters: Vec<TypeName>) -> MethodDecl {
        self.method(name, MethodKind::Action, parameters)
    }

    pub fn choice_method(&self, name: &str, parameters: Vec<TypeName>) -> MethodDecl {
        self.method(name, MethodKind::Choice, parameters)
    }

    fn method(&self, name: &str, kind: MethodKind, parameters: Vec<TypeName>) -> MethodDecl {
        MethodDecl {
            name: self.ident(name),
            kind,
            parameters: parameters
                .into_iter()
                .enumerate()
                .map(|(i, ty)| ParameterDecl {
                    name: self.ident(&format!("arg{i}")),
                    ty,
                    span: self.span(),
                })
                .collect(),
            span: self.span(),
        }
    }

    pub fn reference(&self, name: &str, interface: &str) -> &Self {
        let decl = ReferenceDecl {
            name: self.ident(name),
            interface: self.ident(interface),
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Reference(decl));
        self
    }

    pub fn outcome(&self, name: &str, options: &[&str]) -> &Self {
        self.outcome_full(name, options, None, Visibility::Private)
    }

    pub fn outcome_with_default(&self, name: &str, options: &[&str], default: &str) -> &Self {
        self.outcome_full(name, options, Some(default), Visibility::Private)
    }

    pub fn public_outcome(&self, name: &str, options: &[&str]) -> &Self {
        self.outcome_full(name, options, None, Visibility::Public)
    }

    pub fn outcome_full(
        &self,
        name: &str,
        options: &[&str],
        default: Option<&str>,
        visibility: Visibility,
    ) -> &Self {
        let decl = OutcomeDecl {
            name: self.ident(name),
            options: options.iter().map(|o| self.ident(o)).collect(),
            default: default.map(|d| self.ident(d)),
            visibility,
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Outcome(decl));
        self
    }

    /// Options as `(name, numerator, denominator)` weight triples.
    pub fn spectrum(&self, name: &str, options: &[(&str, u64, u64)]) -> &Self {
        self.spectrum_full(name, options, None, Visibility::Private)
    }

    pub fn spectrum_full(
        &self,
        name: &str,
        options: &[(&str, u64, u64)],
        default: Option<&str>,
        visibility: Visibility,
    ) -> &Self {
        let decl = SpectrumDecl {
            name: self.ident(name),
            options: options
                .iter()
                .map(|&(option, numerator, denominator)| SpectrumOptionDecl {
                    name: self.ident(option),
                    weight: Fraction::new(numerator, denominator),
                    span: self.span(),
                })
                .collect(),
            default: default.map(|d| self.ident(d)),
            visibility,
            span: self.span(),
        };
        self.declarations.borrow_mut().push(Declaration::Spectrum(decl));
        self
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn show(&self, expression: Expression) -> Statement {
        Statement::Output(OutputStatement {
            expression,
            span: self.span(),
        })
    }

    /// One arm per option.
    pub fn switch(&self, options: Vec<(Expression, Vec<Statement>)>) -> Statement {
        self.switch_arms(
            options
                .into_iter()
                .map(|(label, body)| self.switch_arm(vec![label], body))
                .collect(),
        )
    }

    /// Arms with possibly shared bodies; see [`Self::switch_arm`].
    pub fn switch_arms(&self, arms: Vec<SwitchArm>) -> Statement {
        Statement::Switch(SwitchStatement {
            arms,
            span: self.span(),
        })
    }

    /// Several labels presented as separate options, one shared body.
    pub fn switch_arm(&self, labels: Vec<Expression>, body: Vec<Statement>) -> SwitchArm {
        SwitchArm {
            labels,
            body,
            span: self.span(),
        }
    }

    pub fn branch(&self, target: &str, arms: Vec<BranchArm>) -> Statement {
        Statement::BranchOn(BranchOnStatement {
            target: self.ident(target),
            arms,
            span: self.span(),
        })
    }

    pub fn arm(&self, options: &[&str], body: Vec<Statement>) -> BranchArm {
        BranchArm {
            options: options.iter().map(|o| self.ident(o)).collect(),
            is_other: false,
            body,
            span: self.span(),
        }
    }

    pub fn other(&self, body: Vec<Statement>) -> BranchArm {
        BranchArm {
            options: Vec::new(),
            is_other: true,
            body,
            span: self.span(),
        }
    }

    pub fn set(&self, outcome: &str, option: &str) -> Statement {
        Statement::Assign(AssignStatement {
            target: self.ident(outcome),
            option: self.ident(option),
            span: self.span(),
        })
    }

    pub fn run(&self, scene: &str) -> Statement {
        Statement::Run(RunStatement {
            scene: self.ident(scene),
            span: self.span(),
        })
    }

    /// A parser error placeholder.
    pub fn missing_statement(&self) -> Statement {
        Statement::Missing(self.span())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn text(&self, value: &str) -> Expression {
        Expression::StringLiteral(StringLiteral {
            value: value.to_string(),
            span: self.span(),
        })
    }

    pub fn number(&self, value: i64) -> Expression {
        Expression::NumberLiteral(NumberLiteral {
            value,
            span: self.span(),
        })
    }

    pub fn flag(&self, value: bool) -> Expression {
        Expression::FlagLiteral(FlagLiteral {
            value,
            span: self.span(),
        })
    }

    pub fn enum_member(&self, enum_name: &str, member: &str) -> Expression {
        Expression::EnumMember(EnumMemberExpression {
            enum_name: self.ident(enum_name),
            member: self.ident(member),
            span: self.span(),
        })
    }

    pub fn create(&self, record: &str, arguments: Vec<Argument>) -> Expression {
        Expression::RecordCreation(RecordCreationExpression {
            record: self.ident(record),
            arguments,
            span: self.span(),
        })
    }

    pub fn arg(&self, value: Expression) -> Argument {
        Argument {
            name: None,
            span: value.span(),
            value,
        }
    }

    pub fn named_arg(&self, name: &str, value: Expression) -> Argument {
        Argument {
            name: Some(self.ident(name)),
            span: value.span(),
            value,
        }
    }

    pub fn invoke(&self, reference: &str, method: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Invoke(InvokeExpression {
            reference: self.ident(reference),
            method: self.ident(method),
            arguments,
            span: self.span(),
        })
    }

    /// A parser error placeholder.
    pub fn missing_expression(&self) -> Expression {
        Expression::Missing(self.span())
    }
}

impl Default for StoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_declarations_in_order() {
        let b = StoryBuilder::new();
        b.outcome("mood", &["calm", "stormy"]);
        let hello = b.text("hello");
        let show = b.show(hello);
        b.chapter("intro", vec![show]);
        let (module, interner) = b.finish();

        assert_eq!(module.declarations.len(), 2);
        assert_eq!(
            interner.resolve(module.declarations[0].name().name),
            "mood"
        );
        assert!(matches!(module.declarations[1], Declaration::Scene(ref s) if s.is_chapter));
    }

    #[test]
    fn test_spans_are_distinct() {
        let b = StoryBuilder::new();
        let a = b.ident("x");
        let c = b.ident("x");
        assert_eq!(a.name, c.name);
        assert_ne!(a.span, c.span);
    }
}
