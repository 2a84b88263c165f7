//! Translation from bound scene bodies to flow graphs.
//!
//! One case per bound statement kind, composed through the algebra in
//! [`crate::graph`]: sequences left-fold with `append`, branching
//! constructs expand a decision vertex through per-arm placeholders that
//! `replace` splices out, and `run` inlines the callee's finished graph
//! with fresh vertex ids. Scenes are built callees-first; the binder
//! already severed run cycles, so the dependency graph is a DAG.

use crate::graph::{FlowGraph, FlowVertex, VertexId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use skein_ast::types::{OutcomeFlags, SymbolId};
use skein_binder::{
    BoundBranchOn, BoundModule, BoundScene, BoundStatement, BoundSwitch, SymbolTable,
};

/// A hidden storage cell in the generated machine, carrying an
/// outcome's assigned option from its write site to later reads.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RegisterId(pub u32);

impl RegisterId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The scene-independent register assignment: one register per outcome
/// or spectrum that is branched on anywhere or is public, in symbol
/// declaration order. Declaration order keeps the numbering stable
/// across recompiles of unchanged source.
#[derive(Debug, Clone, Default)]
pub struct RegisterAllocation {
    by_symbol: FxHashMap<SymbolId, RegisterId>,
    symbols: Vec<SymbolId>,
}

impl RegisterAllocation {
    pub fn register_for(&self, symbol: SymbolId) -> Option<RegisterId> {
        self.by_symbol.get(&symbol).copied()
    }

    /// The outcome symbol behind each register, in register order.
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Allocate registers for a bound module.
pub fn allocate_registers(module: &BoundModule, symbols: &SymbolTable) -> RegisterAllocation {
    let mut branched: Vec<SymbolId> = Vec::new();
    for scene in &module.scenes {
        collect_branch_targets(&scene.body, &mut branched);
    }

    let mut allocation = RegisterAllocation::default();
    for symbol in symbols.outcomes() {
        let outcome = symbol.as_outcome().expect("outcomes() yields outcomes");
        let needs_register =
            branched.contains(&symbol.id) || outcome.flags.contains(OutcomeFlags::PUBLIC);
        if needs_register {
            let id = RegisterId(allocation.symbols.len() as u32);
            allocation.by_symbol.insert(symbol.id, id);
            allocation.symbols.push(symbol.id);
        }
    }
    allocation
}

fn collect_branch_targets(statements: &[BoundStatement], out: &mut Vec<SymbolId>) {
    for statement in statements {
        match statement {
            BoundStatement::BranchOn(b) => {
                if !out.contains(&b.outcome) {
                    out.push(b.outcome);
                }
                for arm in &b.arms {
                    collect_branch_targets(arm, out);
                }
            }
            BoundStatement::Switch(s) => {
                for arm in &s.arms {
                    collect_branch_targets(&arm.body, out);
                }
            }
            _ => {}
        }
    }
}

/// Builds one flow graph per scene. Vertex ids are scene-scoped and
/// assigned in creation order, which later seeds the lowering stage's
/// canonical state numbering.
pub struct FlowGraphBuilder<'a> {
    module: &'a BoundModule,
    built: FxHashMap<SymbolId, FlowGraph>,
    next_vertex: u32,
}

impl<'a> FlowGraphBuilder<'a> {
    pub fn new(module: &'a BoundModule) -> Self {
        Self {
            module,
            built: FxHashMap::default(),
            next_vertex: 0,
        }
    }

    /// Build every scene, callees before callers, and return the
    /// finished graphs keyed by scene symbol.
    pub fn build_all(mut self) -> FxHashMap<SymbolId, FlowGraph> {
        for index in dependency_order(self.module) {
            let scene = &self.module.scenes[index];
            let graph = self.build_scene(scene);
            self.built.insert(scene.symbol, graph);
        }
        self.built
    }

    fn build_scene(&mut self, scene: &BoundScene) -> FlowGraph {
        self.next_vertex = 0;
        self.build_statements(&scene.body)
    }

    fn fresh(&mut self) -> VertexId {
        let id = VertexId(self.next_vertex);
        self.next_vertex += 1;
        id
    }

    fn build_statements(&mut self, statements: &[BoundStatement]) -> FlowGraph {
        statements.iter().fold(FlowGraph::empty(), |graph, statement| {
            let next = self.build_statement(statement);
            graph.append(&next)
        })
    }

    fn build_statement(&mut self, statement: &BoundStatement) -> FlowGraph {
        match statement {
            BoundStatement::Output(o) => {
                FlowGraph::simple(FlowVertex::output(self.fresh(), o.expression.clone()))
            }
            BoundStatement::Assign(a) => {
                FlowGraph::simple(FlowVertex::assign(self.fresh(), a.outcome, a.option))
            }
            BoundStatement::Run(r) => {
                let callee = self
                    .built
                    .get(&r.scene)
                    .expect("scenes are built in dependency order")
                    .clone();
                callee.reindexed(|| self.fresh())
            }
            BoundStatement::Switch(s) => self.build_switch(s),
            BoundStatement::BranchOn(b) => self.build_branch_on(b),
        }
    }

    /// One decision vertex with an explicit successor per presented
    /// option, then each arm's sub-graph spliced in. Options of one arm
    /// alias the same placeholder, so two choices can converge on one
    /// shared body state. All sub-graphs keep their sentinel tails, so
    /// the whole switch still ends in "whatever comes next" and
    /// converges when appended.
    fn build_switch(&mut self, statement: &BoundSwitch) -> FlowGraph {
        let labels = statement
            .arms
            .iter()
            .flat_map(|arm| arm.labels.iter().cloned())
            .collect();
        let decision = FlowVertex::choice(self.fresh(), labels);
        let arm_placeholders: Vec<VertexId> =
            statement.arms.iter().map(|_| self.fresh()).collect();
        let placeholders = &arm_placeholders;
        let successors: Vec<VertexId> = statement
            .arms
            .iter()
            .enumerate()
            .flat_map(|(arm, a)| a.labels.iter().map(move |_| placeholders[arm]))
            .collect();

        let mut graph = FlowGraph::empty().add_vertex(decision, successors);
        for &placeholder in &arm_placeholders {
            graph = graph.add_vertex(
                FlowVertex::connector(placeholder),
                vec![VertexId::EMPTY],
            );
        }
        for (&placeholder, arm) in arm_placeholders.iter().zip(&statement.arms) {
            let body = self.build_statements(&arm.body);
            graph = graph.replace(placeholder, &body);
        }
        graph
    }

    /// Structurally a switch, but the successor list is indexed by the
    /// outcome's register value: slot `i` belongs to declared option
    /// `i`, and options sharing an arm alias the same placeholder, so
    /// one `replace` wires them all.
    fn build_branch_on(&mut self, statement: &BoundBranchOn) -> FlowGraph {
        let decision = FlowVertex::branch_on(self.fresh(), statement.outcome);
        let arm_placeholders: Vec<VertexId> =
            statement.arms.iter().map(|_| self.fresh()).collect();
        let successors: Vec<VertexId> = statement
            .dispatch
            .iter()
            .map(|&arm| arm_placeholders[arm as usize])
            .collect();

        let mut graph = FlowGraph::empty().add_vertex(decision, successors);
        for &placeholder in &arm_placeholders {
            graph = graph.add_vertex(
                FlowVertex::connector(placeholder),
                vec![VertexId::EMPTY],
            );
        }
        for (&placeholder, arm) in arm_placeholders.iter().zip(&statement.arms) {
            let body = self.build_statements(arm);
            graph = graph.replace(placeholder, &body);
        }
        graph
    }
}

/// Convenience wrapper: build every scene of a bound module.
pub fn build_scenes(module: &BoundModule) -> FxHashMap<SymbolId, FlowGraph> {
    FlowGraphBuilder::new(module).build_all()
}

/// Scene indices with every callee before its callers. The binder
/// guarantees acyclicity; unknown callees are skipped.
fn dependency_order(module: &BoundModule) -> Vec<usize> {
    let index_of: FxHashMap<SymbolId, usize> = module
        .scenes
        .iter()
        .enumerate()
        .map(|(i, s)| (s.symbol, i))
        .collect();
    let mut visited = vec![false; module.scenes.len()];
    let mut order = Vec::with_capacity(module.scenes.len());

    fn visit(
        i: usize,
        module: &BoundModule,
        index_of: &FxHashMap<SymbolId, usize>,
        visited: &mut [bool],
        order: &mut Vec<usize>,
    ) {
        if visited[i] {
            return;
        }
        visited[i] = true;
        for run in &module.scenes[i].runs {
            if let Some(&j) = index_of.get(run) {
                visit(j, module, index_of, visited, order);
            }
        }
        order.push(i);
    }

    for i in 0..module.scenes.len() {
        visit(i, module, &index_of, &mut visited, &mut order);
    }
    order
}
