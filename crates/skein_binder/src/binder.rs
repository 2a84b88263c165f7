//! The binder implementation.
//!
//! Two passes over the module:
//! 1. Declaration collection: every top-level name goes into one global
//!    table before any body is looked at, so scenes may refer to each
//!    other in any order.
//! 2. Body binding: scene bodies are resolved against the table and
//!    validated (outcome coverage, spectrum partitions, record and
//!    interface typing).
//!
//! After body binding, run-dependencies are checked for cycles and a
//! definite-assignment walk marks which outcomes are always assigned
//! before they are read.
//!
//! Binding never fails. Every violation produces one positioned
//! diagnostic and a placeholder (an error symbol, an error expression)
//! so the rest of the script is still examined.

use crate::bound::*;
use crate::symbol::*;
use rustc_hash::{FxHashMap, FxHashSet};
use skein_ast::fraction::Fraction;
use skein_ast::node::*;
use skein_ast::types::{OutcomeFlags, SymbolId};
use skein_core::intern::NameInterner;
use skein_core::text::TextSpan;
use skein_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};

/// Where an expression appears; decides which method kinds are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprContext {
    /// The expression of an output statement.
    OutputRoot,
    /// The label of a switch option.
    SwitchLabel,
    /// An argument to a record creation or method invocation.
    Argument,
}

/// Everything binding produces: the bound tree, the frozen symbol
/// table, and the diagnostics raised along the way.
#[derive(Debug)]
pub struct BindResult {
    pub module: BoundModule,
    pub symbols: SymbolTable,
    pub diagnostics: DiagnosticCollection,
}

impl BindResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// The binder creates symbols, resolves names, and validates bodies.
pub struct Binder {
    interner: NameInterner,
    symbols: SymbolTable,
    diagnostics: DiagnosticCollection,
}

impl Binder {
    pub fn new(interner: NameInterner) -> Self {
        Self {
            interner,
            symbols: SymbolTable::new(),
            diagnostics: DiagnosticCollection::new(),
        }
    }

    /// Bind a whole module. Consumes the binder; the result carries the
    /// frozen table.
    pub fn bind_module(mut self, module: &Module) -> BindResult {
        self.collect_declarations(module);
        self.populate_members(module);

        let mut scenes = Vec::new();
        for decl in &module.declarations {
            if let Declaration::Scene(scene) = decl {
                if let Some(symbol) = self.owned_symbol(&scene.name) {
                    let bound = self.bind_scene(symbol, scene);
                    scenes.push(bound);
                }
            }
        }

        let order = self.check_run_cycles(&scenes);
        self.analyze_assignment(&scenes, &order);

        BindResult {
            module: BoundModule { scenes },
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn error_at(&mut self, span: TextSpan, message: &DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::at(span, message, args));
    }

    fn name_str(&self, name: skein_core::intern::Name) -> String {
        self.interner.resolve(name).to_string()
    }

    // ========================================================================
    // Pass 1: declaration collection
    // ========================================================================

    fn collect_declarations(&mut self, module: &Module) {
        for decl in &module.declarations {
            let ident = *decl.name();
            if self.symbols.resolve(ident.name).is_some() {
                let n = self.name_str(ident.name);
                self.error_at(ident.span, &messages::DUPLICATE_DECLARATION, &[&n]);
                continue;
            }
            let kind = match decl {
                Declaration::Scene(d) => SymbolKind::Scene(SceneSymbol {
                    is_chapter: d.is_chapter,
                }),
                Declaration::Record(_) => SymbolKind::Record(RecordSymbol {
                    properties: Vec::new(),
                }),
                Declaration::Enum(d) => SymbolKind::Enum(self.collect_enum(d)),
                Declaration::Interface(_) => SymbolKind::Interface(InterfaceSymbol {
                    methods: Vec::new(),
                }),
                Declaration::Reference(_) => SymbolKind::Reference(ReferenceSymbol {
                    interface: SymbolId::INVALID,
                }),
                Declaration::Outcome(d) => SymbolKind::Outcome(self.collect_outcome(d)),
                Declaration::Spectrum(d) => SymbolKind::Outcome(self.collect_spectrum(d)),
            };
            self.symbols.declare(ident.name, kind, ident.span);
        }
    }

    fn collect_enum(&mut self, decl: &EnumDecl) -> EnumSymbol {
        let mut members = Vec::new();
        for member in &decl.members {
            if members.contains(&member.name) {
                let owner = self.name_str(decl.name.name);
                let m = self.name_str(member.name);
                self.error_at(member.span, &messages::DUPLICATE_MEMBER, &[&owner, &m]);
                continue;
            }
            members.push(member.name);
        }
        EnumSymbol { members }
    }

    /// Shared option-list validation for outcomes and spectrums.
    fn collect_options(
        &mut self,
        name: &Identifier,
        options: impl Iterator<Item = Identifier>,
        default: &Option<Identifier>,
        visibility: Visibility,
        span: TextSpan,
    ) -> OutcomeSymbol {
        let mut names = Vec::new();
        for option in options {
            if names.contains(&option.name) {
                let owner = self.name_str(name.name);
                let o = self.name_str(option.name);
                self.error_at(option.span, &messages::DUPLICATE_OPTION, &[&owner, &o]);
                continue;
            }
            names.push(option.name);
        }
        if names.is_empty() {
            let owner = self.name_str(name.name);
            self.error_at(span, &messages::OUTCOME_HAS_NO_OPTIONS, &[&owner]);
        }
        let default_index = default.as_ref().and_then(|d| {
            let idx = names.iter().position(|&n| n == d.name);
            if idx.is_none() {
                let owner = self.name_str(name.name);
                let o = self.name_str(d.name);
                self.error_at(d.span, &messages::UNKNOWN_DEFAULT_OPTION, &[&owner, &o]);
            }
            idx.map(|i| i as u32)
        });
        let mut flags = OutcomeFlags::NONE;
        if visibility == Visibility::Public {
            flags |= OutcomeFlags::PUBLIC;
        }
        if default_index.is_some() {
            flags |= OutcomeFlags::ALWAYS_ASSIGNED;
        }
        OutcomeSymbol {
            options: names,
            default: default_index,
            flags,
            intervals: None,
        }
    }

    fn collect_outcome(&mut self, decl: &OutcomeDecl) -> OutcomeSymbol {
        self.collect_options(
            &decl.name,
            decl.options.iter().copied(),
            &decl.default,
            decl.visibility,
            decl.span,
        )
    }

    fn collect_spectrum(&mut self, decl: &SpectrumDecl) -> OutcomeSymbol {
        let mut symbol = self.collect_options(
            &decl.name,
            decl.options.iter().map(|o| o.name),
            &decl.default,
            decl.visibility,
            decl.span,
        );
        symbol.flags |= OutcomeFlags::SPECTRUM;
        symbol.intervals = self.collect_intervals(decl, &symbol);
        symbol
    }

    /// Build the unit-interval partition from the declared weights.
    /// Returns `None` when the weights are malformed; the diagnostic has
    /// already been raised.
    fn collect_intervals(
        &mut self,
        decl: &SpectrumDecl,
        symbol: &OutcomeSymbol,
    ) -> Option<Vec<SpectrumInterval>> {
        let owner = self.name_str(decl.name.name);
        let mut intervals = Vec::new();
        let mut cumulative = Fraction::ZERO;
        let mut valid = true;
        // Walk the deduplicated option list so a duplicated option does
        // not double-count its weight on top of the duplicate error.
        for (index, &name) in symbol.options.iter().enumerate() {
            let option = decl
                .options
                .iter()
                .find(|o| o.name.name == name)
                .expect("option list is derived from the declaration");
            let o = self.name_str(name);
            if option.weight.is_undefined() {
                self.error_at(option.span, &messages::SPECTRUM_ZERO_DENOMINATOR, &[&owner, &o]);
                valid = false;
                continue;
            }
            if option.weight.is_zero() {
                self.error_at(option.span, &messages::SPECTRUM_INTERVAL_EMPTY, &[&owner, &o]);
                valid = false;
                continue;
            }
            cumulative = cumulative.add(&option.weight);
            if cumulative > Fraction::ONE {
                self.error_at(option.span, &messages::SPECTRUM_MASS_ABOVE_ONE, &[&owner, &o]);
                valid = false;
                continue;
            }
            intervals.push(SpectrumInterval {
                option: index as u32,
                upper: cumulative,
                inclusive: false,
            });
        }
        if valid && cumulative < Fraction::ONE {
            let covered = cumulative.to_string();
            self.error_at(decl.span, &messages::SPECTRUM_MASS_BELOW_ONE, &[&owner, &covered]);
            valid = false;
        }
        if !valid {
            return None;
        }
        if let Some(last) = intervals.last_mut() {
            last.inclusive = true;
        }
        Some(intervals)
    }

    // ========================================================================
    // Pass 1b: member population (needs the full table for type names)
    // ========================================================================

    fn populate_members(&mut self, module: &Module) {
        for decl in &module.declarations {
            let Some(symbol) = self.owned_symbol(decl.name()) else {
                continue;
            };
            match decl {
                Declaration::Record(d) => {
                    let properties = self.bind_properties(d);
                    if let SymbolKind::Record(r) = &mut self.symbols.get_mut(symbol).kind {
                        r.properties = properties;
                    }
                }
                Declaration::Interface(d) => {
                    let methods = self.bind_methods(d);
                    if let SymbolKind::Interface(i) = &mut self.symbols.get_mut(symbol).kind {
                        i.methods = methods;
                    }
                }
                Declaration::Reference(d) => {
                    let interface = match self.resolve_name(&d.interface) {
                        None => SymbolId::INVALID,
                        Some(id) => {
                            if matches!(self.symbols.get(id).kind, SymbolKind::Interface(_)) {
                                id
                            } else {
                                let n = self.name_str(d.interface.name);
                                self.error_at(
                                    d.interface.span,
                                    &messages::NAME_IS_NOT_AN_INTERFACE,
                                    &[&n],
                                );
                                SymbolId::INVALID
                            }
                        }
                    };
                    if let SymbolKind::Reference(r) = &mut self.symbols.get_mut(symbol).kind {
                        r.interface = interface;
                    }
                }
                _ => {}
            }
        }
    }

    fn bind_properties(&mut self, decl: &RecordDecl) -> Vec<PropertySymbol> {
        let mut properties: Vec<PropertySymbol> = Vec::new();
        for prop in &decl.properties {
            if properties.iter().any(|p| p.name == prop.name.name) {
                let owner = self.name_str(decl.name.name);
                let p = self.name_str(prop.name.name);
                self.error_at(prop.name.span, &messages::DUPLICATE_MEMBER, &[&owner, &p]);
                continue;
            }
            let ty = self.resolve_type(&prop.ty);
            properties.push(PropertySymbol {
                name: prop.name.name,
                ty,
                span: prop.span,
            });
        }
        properties
    }

    fn bind_methods(&mut self, decl: &InterfaceDecl) -> Vec<InterfaceMethodSymbol> {
        let mut methods: Vec<InterfaceMethodSymbol> = Vec::new();
        for method in &decl.methods {
            if methods.iter().any(|m| m.name == method.name.name) {
                let owner = self.name_str(decl.name.name);
                let m = self.name_str(method.name.name);
                self.error_at(method.name.span, &messages::DUPLICATE_MEMBER, &[&owner, &m]);
                continue;
            }
            let parameters = method
                .parameters
                .iter()
                .map(|p| self.resolve_type(&p.ty))
                .collect();
            methods.push(InterfaceMethodSymbol {
                name: method.name.name,
                kind: method.kind,
                parameters,
                span: method.span,
            });
        }
        methods
    }

    fn resolve_type(&mut self, ty: &TypeName) -> ResolvedType {
        match ty {
            TypeName::Text => ResolvedType::Text,
            TypeName::Number => ResolvedType::Number,
            TypeName::Flag => ResolvedType::Flag,
            TypeName::Named(ident) => {
                let Some(id) = self.resolve_name(ident) else {
                    return ResolvedType::Error;
                };
                let resolved = match &self.symbols.get(id).kind {
                    SymbolKind::Record(_) => Some(ResolvedType::Record(id)),
                    SymbolKind::Enum(_) => Some(ResolvedType::Enum(id)),
                    _ => None,
                };
                resolved.unwrap_or_else(|| {
                    let n = self.name_str(ident.name);
                    self.error_at(ident.span, &messages::NAME_IS_NOT_A_TYPE, &[&n]);
                    ResolvedType::Error
                })
            }
        }
    }

    // ========================================================================
    // Pass 2: scene bodies
    // ========================================================================

    fn bind_scene(&mut self, symbol: SymbolId, decl: &SceneDecl) -> BoundScene {
        let mut runs = Vec::new();
        let body = self.bind_statements(&decl.body, &mut runs);
        BoundScene { symbol, body, runs }
    }

    fn bind_statements(
        &mut self,
        statements: &[Statement],
        runs: &mut Vec<SymbolId>,
    ) -> Vec<BoundStatement> {
        statements
            .iter()
            .filter_map(|s| self.bind_statement(s, runs))
            .collect()
    }

    fn bind_statement(
        &mut self,
        statement: &Statement,
        runs: &mut Vec<SymbolId>,
    ) -> Option<BoundStatement> {
        match statement {
            Statement::Output(s) => {
                let expression = self.bind_expression(&s.expression, ExprContext::OutputRoot);
                Some(BoundStatement::Output(BoundOutput {
                    expression,
                    span: s.span,
                }))
            }
            Statement::Switch(s) if s.arms.is_empty() => None,
            Statement::Switch(s) => {
                let arms = s
                    .arms
                    .iter()
                    .map(|arm| BoundSwitchArm {
                        labels: arm
                            .labels
                            .iter()
                            .map(|l| self.bind_expression(l, ExprContext::SwitchLabel))
                            .collect(),
                        body: self.bind_statements(&arm.body, runs),
                    })
                    .collect();
                Some(BoundStatement::Switch(BoundSwitch { arms, span: s.span }))
            }
            Statement::BranchOn(s) => self.bind_branch_on(s, runs),
            Statement::Assign(s) => self.bind_assign(s),
            Statement::Run(s) => self.bind_run(s, runs),
            // Missing statements were diagnosed upstream and contribute
            // no vertex.
            Statement::Missing(_) => None,
        }
    }

    fn bind_assign(&mut self, statement: &AssignStatement) -> Option<BoundStatement> {
        let outcome_id = self.resolve_outcome(&statement.target)?;
        let outcome = self.symbols.get(outcome_id).as_outcome().expect("resolved as outcome");
        match outcome.option_index(statement.option.name) {
            Some(option) => Some(BoundStatement::Assign(BoundAssign {
                outcome: outcome_id,
                option,
                span: statement.span,
            })),
            None => {
                let owner = self.name_str(statement.target.name);
                let o = self.name_str(statement.option.name);
                self.error_at(
                    statement.option.span,
                    &messages::ASSIGNED_OPTION_NOT_DECLARED,
                    &[&owner, &o],
                );
                None
            }
        }
    }

    fn bind_run(
        &mut self,
        statement: &RunStatement,
        runs: &mut Vec<SymbolId>,
    ) -> Option<BoundStatement> {
        let id = self.resolve_name(&statement.scene)?;
        if !matches!(self.symbols.get(id).kind, SymbolKind::Scene(_)) {
            let n = self.name_str(statement.scene.name);
            self.error_at(statement.scene.span, &messages::NAME_IS_NOT_A_SCENE, &[&n]);
            return None;
        }
        if !runs.contains(&id) {
            runs.push(id);
        }
        Some(BoundStatement::Run(BoundRun {
            scene: id,
            span: statement.span,
        }))
    }

    fn bind_branch_on(
        &mut self,
        statement: &BranchOnStatement,
        runs: &mut Vec<SymbolId>,
    ) -> Option<BoundStatement> {
        let outcome_id = self.resolve_outcome(&statement.target);
        // Bind every arm body first so nested problems surface even when
        // the branch head is broken.
        let arms: Vec<Vec<BoundStatement>> = statement
            .arms
            .iter()
            .map(|arm| self.bind_statements(&arm.body, runs))
            .collect();
        let outcome_id = outcome_id?;
        let outcome = self
            .symbols
            .get(outcome_id)
            .as_outcome()
            .expect("resolved as outcome")
            .clone();
        let owner = self.name_str(statement.target.name);

        let mut covered: Vec<Option<u32>> = vec![None; outcome.options.len()];
        let mut other_arm: Option<u32> = None;
        let mut valid = true;
        for (arm_index, arm) in statement.arms.iter().enumerate() {
            if arm.is_other {
                if other_arm.is_some() {
                    self.error_at(arm.span, &messages::DUPLICATE_OTHER_BRANCH, &[]);
                    valid = false;
                } else {
                    other_arm = Some(arm_index as u32);
                }
                continue;
            }
            for option in &arm.options {
                match outcome.option_index(option.name) {
                    None => {
                        let o = self.name_str(option.name);
                        self.error_at(
                            option.span,
                            &messages::BRANCH_OPTION_NOT_DECLARED,
                            &[&owner, &o],
                        );
                        valid = false;
                    }
                    Some(index) => {
                        if covered[index as usize].is_some() {
                            let o = self.name_str(option.name);
                            self.error_at(
                                option.span,
                                &messages::DUPLICATE_BRANCH_OPTION,
                                &[&owner, &o],
                            );
                            valid = false;
                        } else {
                            covered[index as usize] = Some(arm_index as u32);
                        }
                    }
                }
            }
        }

        let uncovered: Vec<&skein_core::intern::Name> = covered
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| &outcome.options[i])
            .collect();
        match (uncovered.is_empty(), other_arm) {
            (false, None) => {
                let list = uncovered
                    .iter()
                    .map(|&&n| format!("'{}'", self.interner.resolve(n)))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.error_at(statement.span, &messages::BRANCH_MISSING_OPTIONS, &[&owner, &list]);
                valid = false;
            }
            (true, Some(_)) => {
                self.error_at(statement.span, &messages::UNREACHABLE_OTHER_BRANCH, &[&owner]);
                valid = false;
            }
            _ => {}
        }
        if !valid {
            return None;
        }

        let dispatch = covered
            .into_iter()
            .map(|c| c.or(other_arm).expect("coverage was just validated"))
            .collect();
        Some(BoundStatement::BranchOn(BoundBranchOn {
            outcome: outcome_id,
            arms,
            dispatch,
            span: statement.span,
        }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn bind_expression(&mut self, expression: &Expression, ctx: ExprContext) -> BoundExpression {
        match expression {
            Expression::StringLiteral(e) => BoundExpression::Text(e.value.clone()),
            Expression::NumberLiteral(e) => BoundExpression::Number(e.value),
            Expression::FlagLiteral(e) => BoundExpression::Flag(e.value),
            Expression::EnumMember(e) => self.bind_enum_member(e),
            Expression::RecordCreation(e) => self.bind_record_creation(e),
            Expression::Invoke(e) => self.bind_invoke(e, ctx),
            Expression::Missing(_) => BoundExpression::Error,
        }
    }

    fn bind_enum_member(&mut self, expression: &EnumMemberExpression) -> BoundExpression {
        let Some(id) = self.resolve_name(&expression.enum_name) else {
            return BoundExpression::Error;
        };
        let members = match &self.symbols.get(id).kind {
            SymbolKind::Enum(e) => Some(e.members.clone()),
            _ => None,
        };
        let Some(members) = members else {
            let n = self.name_str(expression.enum_name.name);
            self.error_at(expression.enum_name.span, &messages::NAME_IS_NOT_AN_ENUM, &[&n]);
            return BoundExpression::Error;
        };
        match members.iter().position(|&m| m == expression.member.name) {
            Some(index) => BoundExpression::EnumMember {
                enum_symbol: id,
                member: index as u32,
            },
            None => {
                let owner = self.name_str(expression.enum_name.name);
                let m = self.name_str(expression.member.name);
                self.error_at(expression.member.span, &messages::UNKNOWN_ENUM_MEMBER, &[&owner, &m]);
                BoundExpression::Error
            }
        }
    }

    fn bind_record_creation(&mut self, expression: &RecordCreationExpression) -> BoundExpression {
        let record_id = self.resolve_record(&expression.record);
        let Some(record_id) = record_id else {
            for argument in &expression.arguments {
                self.bind_expression(&argument.value, ExprContext::Argument);
            }
            return BoundExpression::Error;
        };
        let record = self
            .symbols
            .get(record_id)
            .as_record()
            .expect("resolved as record")
            .clone();
        let owner = self.name_str(expression.record.name);
        let property_count = record.properties.len();

        let mut slots: Vec<Option<BoundExpression>> = vec![None; property_count];
        let mut seen_named = false;
        let mut next_positional = 0usize;
        let mut overflowed = false;
        for argument in &expression.arguments {
            let value = self.bind_expression(&argument.value, ExprContext::Argument);
            match &argument.name {
                Some(property) => {
                    seen_named = true;
                    match record.properties.iter().position(|p| p.name == property.name) {
                        None => {
                            let p = self.name_str(property.name);
                            self.error_at(property.span, &messages::UNKNOWN_PROPERTY, &[&owner, &p]);
                        }
                        Some(index) => {
                            if slots[index].is_some() {
                                let p = self.name_str(property.name);
                                self.error_at(
                                    argument.span,
                                    &messages::DUPLICATE_PROPERTY_ARGUMENT,
                                    &[&owner, &p],
                                );
                            } else {
                                self.check_property_type(&record, index, &value, argument.span, &owner);
                                slots[index] = Some(value);
                            }
                        }
                    }
                }
                None => {
                    if seen_named {
                        self.error_at(argument.span, &messages::POSITIONAL_AFTER_NAMED, &[]);
                        continue;
                    }
                    if next_positional >= property_count {
                        overflowed = true;
                        continue;
                    }
                    self.check_property_type(&record, next_positional, &value, argument.span, &owner);
                    slots[next_positional] = Some(value);
                    next_positional += 1;
                }
            }
        }
        if overflowed {
            let expected = property_count.to_string();
            let got = expression.arguments.len().to_string();
            self.error_at(expression.span, &messages::TOO_MANY_ARGUMENTS, &[&owner, &expected, &got]);
        }

        let mut fields = Vec::with_capacity(property_count);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(value) => fields.push(value),
                None => {
                    let p = self.name_str(record.properties[index].name);
                    self.error_at(expression.span, &messages::MISSING_ARGUMENT, &[&owner, &p]);
                    fields.push(BoundExpression::Error);
                }
            }
        }
        BoundExpression::Record {
            record: record_id,
            fields,
        }
    }

    fn check_property_type(
        &mut self,
        record: &RecordSymbol,
        index: usize,
        value: &BoundExpression,
        span: TextSpan,
        owner: &str,
    ) {
        let expected = record.properties[index].ty;
        let actual = self.expression_type(value);
        if !expected.accepts(&actual) {
            let p = self.name_str(record.properties[index].name);
            let e = self.type_display(&expected);
            let a = self.type_display(&actual);
            self.error_at(span, &messages::ARGUMENT_TYPE_MISMATCH, &[owner, &p, &e, &a]);
        }
    }

    fn bind_invoke(&mut self, expression: &InvokeExpression, ctx: ExprContext) -> BoundExpression {
        let arguments: Vec<BoundExpression> = expression
            .arguments
            .iter()
            .map(|a| self.bind_expression(a, ExprContext::Argument))
            .collect();
        let Some(reference_id) = self.resolve_reference(&expression.reference) else {
            return BoundExpression::Error;
        };
        let interface_id = self
            .symbols
            .get(reference_id)
            .as_reference()
            .expect("resolved as reference")
            .interface;
        if interface_id.is_invalid() {
            // The reference declaration already failed to resolve its
            // interface; that was diagnosed there.
            return BoundExpression::Error;
        }
        let interface = self
            .symbols
            .get(interface_id)
            .as_interface()
            .expect("references bind to interfaces")
            .clone();
        let interface_name = self.name_str(self.symbols.get(interface_id).name);
        let method_name = self.name_str(expression.method.name);

        let Some(method_index) = interface
            .methods
            .iter()
            .position(|m| m.name == expression.method.name)
        else {
            self.error_at(
                expression.method.span,
                &messages::UNKNOWN_METHOD,
                &[&interface_name, &method_name],
            );
            return BoundExpression::Error;
        };
        let method = &interface.methods[method_index];

        match (method.kind, ctx) {
            (MethodKind::Action, ExprContext::OutputRoot)
            | (MethodKind::Choice, ExprContext::SwitchLabel) => {}
            (MethodKind::Choice, _) => {
                self.error_at(expression.span, &messages::CHOICE_METHOD_OUTSIDE_SWITCH, &[&method_name]);
            }
            (MethodKind::Action, ExprContext::SwitchLabel) => {
                self.error_at(expression.span, &messages::ACTION_METHOD_AS_LABEL, &[&method_name]);
            }
            (MethodKind::Action, ExprContext::Argument) => {
                self.error_at(expression.span, &messages::INVOKE_AS_ARGUMENT, &[]);
            }
        }

        if method.parameters.len() != arguments.len() {
            let expected = method.parameters.len().to_string();
            let got = arguments.len().to_string();
            self.error_at(
                expression.span,
                &messages::METHOD_ARGUMENT_COUNT,
                &[&interface_name, &method_name, &expected, &got],
            );
        } else {
            for (index, (parameter, argument)) in
                method.parameters.iter().zip(&arguments).enumerate()
            {
                let actual = self.expression_type(argument);
                if !parameter.accepts(&actual) {
                    let position = (index + 1).to_string();
                    let e = self.type_display(parameter);
                    let a = self.type_display(&actual);
                    self.error_at(
                        expression.span,
                        &messages::METHOD_ARGUMENT_TYPE,
                        &[&interface_name, &method_name, &position, &e, &a],
                    );
                }
            }
        }

        BoundExpression::Invoke {
            reference: reference_id,
            method: method_index as u32,
            arguments,
        }
    }

    fn expression_type(&self, expression: &BoundExpression) -> ResolvedType {
        match expression {
            BoundExpression::Text(_) => ResolvedType::Text,
            BoundExpression::Number(_) => ResolvedType::Number,
            BoundExpression::Flag(_) => ResolvedType::Flag,
            BoundExpression::EnumMember { enum_symbol, .. } => ResolvedType::Enum(*enum_symbol),
            BoundExpression::Record { record, .. } => ResolvedType::Record(*record),
            BoundExpression::Invoke { .. } | BoundExpression::Error => ResolvedType::Error,
        }
    }

    fn type_display(&self, ty: &ResolvedType) -> String {
        match ty {
            ResolvedType::Text => "text".to_string(),
            ResolvedType::Number => "number".to_string(),
            ResolvedType::Flag => "flag".to_string(),
            ResolvedType::Record(id) | ResolvedType::Enum(id) => {
                self.name_str(self.symbols.get(*id).name)
            }
            ResolvedType::Error => "<error>".to_string(),
        }
    }

    // ========================================================================
    // Name resolution helpers
    // ========================================================================

    /// Resolve an identifier or report it once. An unresolvable name is
    /// declared as an error symbol so later uses stay silent.
    fn resolve_name(&mut self, ident: &Identifier) -> Option<SymbolId> {
        match self.symbols.resolve(ident.name) {
            Some(id) => {
                if matches!(self.symbols.get(id).kind, SymbolKind::Error) {
                    None
                } else {
                    Some(id)
                }
            }
            None => {
                let n = self.name_str(ident.name);
                self.error_at(ident.span, &messages::CANNOT_FIND_NAME, &[&n]);
                self.symbols.declare(ident.name, SymbolKind::Error, ident.span);
                None
            }
        }
    }

    fn resolve_outcome(&mut self, ident: &Identifier) -> Option<SymbolId> {
        let id = self.resolve_name(ident)?;
        if matches!(self.symbols.get(id).kind, SymbolKind::Outcome(_)) {
            return Some(id);
        }
        let n = self.name_str(ident.name);
        self.error_at(ident.span, &messages::NAME_IS_NOT_AN_OUTCOME, &[&n]);
        None
    }

    fn resolve_record(&mut self, ident: &Identifier) -> Option<SymbolId> {
        let id = self.resolve_name(ident)?;
        if matches!(self.symbols.get(id).kind, SymbolKind::Record(_)) {
            return Some(id);
        }
        let n = self.name_str(ident.name);
        self.error_at(ident.span, &messages::NAME_IS_NOT_A_RECORD, &[&n]);
        None
    }

    fn resolve_reference(&mut self, ident: &Identifier) -> Option<SymbolId> {
        let id = self.resolve_name(ident)?;
        if matches!(self.symbols.get(id).kind, SymbolKind::Reference(_)) {
            return Some(id);
        }
        let n = self.name_str(ident.name);
        self.error_at(ident.span, &messages::NAME_IS_NOT_A_REFERENCE, &[&n]);
        None
    }

    /// The symbol a declaration owns, or `None` if the declaration lost
    /// a duplicate-name race (the first declaration wins the symbol).
    fn owned_symbol(&self, ident: &Identifier) -> Option<SymbolId> {
        let id = self.symbols.resolve(ident.name)?;
        let symbol = self.symbols.get(id);
        (symbol.span == ident.span).then_some(id)
    }

    // ========================================================================
    // Run-dependency cycles
    // ========================================================================

    /// Diagnose scenes that reach themselves through `run` and return a
    /// dependency order (callees before callers) over the acyclic rest.
    fn check_run_cycles(&mut self, scenes: &[BoundScene]) -> Vec<usize> {
        let index_of: FxHashMap<SymbolId, usize> = scenes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.symbol, i))
            .collect();

        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color = vec![WHITE; scenes.len()];
        let mut in_cycle = vec![false; scenes.len()];
        let mut order = Vec::with_capacity(scenes.len());

        fn visit(
            i: usize,
            scenes: &[BoundScene],
            index_of: &FxHashMap<SymbolId, usize>,
            color: &mut [u8],
            in_cycle: &mut [bool],
            stack: &mut Vec<usize>,
            order: &mut Vec<usize>,
        ) {
            color[i] = GRAY;
            stack.push(i);
            for run in &scenes[i].runs {
                let Some(&j) = index_of.get(run) else { continue };
                match color[j] {
                    WHITE => visit(j, scenes, index_of, color, in_cycle, stack, order),
                    GRAY => {
                        // Everything from j to the top of the stack is
                        // on the cycle.
                        let start = stack.iter().position(|&s| s == j).unwrap_or(0);
                        for &s in &stack[start..] {
                            in_cycle[s] = true;
                        }
                    }
                    _ => {}
                }
            }
            stack.pop();
            color[i] = BLACK;
            order.push(i);
        }

        let mut stack = Vec::new();
        for i in 0..scenes.len() {
            if color[i] == WHITE {
                visit(i, scenes, &index_of, &mut color, &mut in_cycle, &mut stack, &mut order);
            }
        }

        for (i, &cyclic) in in_cycle.iter().enumerate() {
            if cyclic {
                let symbol = self.symbols.get(scenes[i].symbol);
                let n = self.name_str(symbol.name);
                let span = symbol.span;
                self.error_at(span, &messages::SCENE_RUNS_ITSELF, &[&n]);
            }
        }

        order.retain(|&i| !in_cycle[i]);
        order
    }

    // ========================================================================
    // Definite assignment
    // ========================================================================

    /// Walk every scene in dependency order, tracking which outcomes are
    /// assigned on all paths. A branch-on of a possibly-unassigned
    /// outcome without a default is an error; outcomes whose every read
    /// is dominated by an assignment get the always-assigned flag.
    fn analyze_assignment(&mut self, scenes: &[BoundScene], order: &[usize]) {
        let mut summaries: FxHashMap<SymbolId, FxHashSet<SymbolId>> = FxHashMap::default();
        let mut reads: FxHashSet<SymbolId> = FxHashSet::default();
        let mut unassigned_reads: FxHashSet<SymbolId> = FxHashSet::default();

        for &i in order {
            let scene = &scenes[i];
            let mut assigned = FxHashSet::default();
            self.walk_assignment(
                &scene.body,
                &mut assigned,
                &summaries,
                &mut reads,
                &mut unassigned_reads,
            );
            summaries.insert(scene.symbol, assigned);
        }

        let outcome_ids: Vec<SymbolId> = self.symbols.outcomes().map(|s| s.id).collect();
        for id in outcome_ids {
            let dominated = reads.contains(&id) && !unassigned_reads.contains(&id);
            if dominated {
                if let SymbolKind::Outcome(o) = &mut self.symbols.get_mut(id).kind {
                    o.flags |= OutcomeFlags::ALWAYS_ASSIGNED;
                }
            }
        }
    }

    fn walk_assignment(
        &mut self,
        statements: &[BoundStatement],
        assigned: &mut FxHashSet<SymbolId>,
        summaries: &FxHashMap<SymbolId, FxHashSet<SymbolId>>,
        reads: &mut FxHashSet<SymbolId>,
        unassigned_reads: &mut FxHashSet<SymbolId>,
    ) {
        for statement in statements {
            match statement {
                BoundStatement::Output(_) => {}
                BoundStatement::Assign(a) => {
                    assigned.insert(a.outcome);
                }
                BoundStatement::Run(r) => {
                    if let Some(summary) = summaries.get(&r.scene) {
                        assigned.extend(summary.iter().copied());
                    }
                }
                BoundStatement::Switch(s) => {
                    let bodies: Vec<&[BoundStatement]> =
                        s.arms.iter().map(|a| a.body.as_slice()).collect();
                    self.walk_branches(&bodies, assigned, summaries, reads, unassigned_reads);
                }
                BoundStatement::BranchOn(b) => {
                    reads.insert(b.outcome);
                    let has_default = self
                        .symbols
                        .get(b.outcome)
                        .as_outcome()
                        .is_some_and(|o| o.default.is_some());
                    if !assigned.contains(&b.outcome) && !has_default {
                        if unassigned_reads.insert(b.outcome) {
                            let n = self.name_str(self.symbols.get(b.outcome).name);
                            self.error_at(b.span, &messages::OUTCOME_MAY_BE_UNASSIGNED, &[&n]);
                        }
                    } else if !assigned.contains(&b.outcome) {
                        unassigned_reads.insert(b.outcome);
                    }
                    let bodies: Vec<&[BoundStatement]> =
                        b.arms.iter().map(|a| a.as_slice()).collect();
                    self.walk_branches(&bodies, assigned, summaries, reads, unassigned_reads);
                }
            }
        }
    }

    /// Branches diverge from the same pre-state; what survives the join
    /// is the intersection of what each branch guarantees.
    fn walk_branches(
        &mut self,
        bodies: &[&[BoundStatement]],
        assigned: &mut FxHashSet<SymbolId>,
        summaries: &FxHashMap<SymbolId, FxHashSet<SymbolId>>,
        reads: &mut FxHashSet<SymbolId>,
        unassigned_reads: &mut FxHashSet<SymbolId>,
    ) {
        let mut merged: Option<FxHashSet<SymbolId>> = None;
        for body in bodies {
            let mut branch = assigned.clone();
            self.walk_assignment(body, &mut branch, summaries, reads, unassigned_reads);
            merged = Some(match merged {
                None => branch,
                Some(m) => m.intersection(&branch).copied().collect(),
            });
        }
        if let Some(m) = merged {
            *assigned = m;
        }
    }
}
