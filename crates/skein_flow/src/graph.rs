//! The flow graph value type and its composition algebra.
//!
//! A graph is a set of vertices keyed by builder-assigned id, an
//! adjacency map of ordered successor lists, and a start vertex. The
//! reserved [`VertexId::EMPTY`] appearing as a successor means "not yet
//! wired — the caller supplies the continuation"; it is what lets every
//! statement's sub-graph be built before its surrounding context exists.
//!
//! All four primitives return new graphs. Misusing the algebra (id
//! collisions, replacing an absent vertex) is a defect in the compiler
//! itself and panics with a labeled internal-invariant message; it is
//! never reachable from user input.

use indexmap::IndexMap;
use skein_ast::types::SymbolId;
use skein_binder::BoundExpression;

/// A builder-assigned vertex identity. Not yet the final lowered state
/// number; lowering renumbers surviving vertices in creation order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VertexId(pub u32);

impl VertexId {
    /// The sentinel successor: "whatever comes next".
    pub const EMPTY: VertexId = VertexId(u32::MAX);

    #[inline]
    pub fn is_empty_sentinel(self) -> bool {
        self == Self::EMPTY
    }
}

/// What a vertex does when the machine passes through it.
#[derive(Debug, Clone)]
pub enum VertexKind {
    /// Produce the bound expression as output. Single successor.
    Output(BoundExpression),
    /// Present labeled options; the user's choice selects the
    /// successor with the same index.
    Choice(Vec<BoundExpression>),
    /// Dispatch on the outcome's register; the successor list has one
    /// entry per declared option.
    BranchOn(SymbolId),
    /// Write an option into the outcome's register. Control-only,
    /// single successor.
    Assign { outcome: SymbolId, option: u32 },
    /// Pure control. Splice placeholders and severed statements.
    Connector,
}

/// A value object: identity plus payload. Edges live in the graph.
#[derive(Debug, Clone)]
pub struct FlowVertex {
    pub id: VertexId,
    pub kind: VertexKind,
}

impl FlowVertex {
    pub fn output(id: VertexId, expression: BoundExpression) -> Self {
        Self { id, kind: VertexKind::Output(expression) }
    }

    pub fn choice(id: VertexId, labels: Vec<BoundExpression>) -> Self {
        Self { id, kind: VertexKind::Choice(labels) }
    }

    pub fn branch_on(id: VertexId, outcome: SymbolId) -> Self {
        Self { id, kind: VertexKind::BranchOn(outcome) }
    }

    pub fn assign(id: VertexId, outcome: SymbolId, option: u32) -> Self {
        Self { id, kind: VertexKind::Assign { outcome, option } }
    }

    pub fn connector(id: VertexId) -> Self {
        Self { id, kind: VertexKind::Connector }
    }

    /// The output this vertex displays, if any.
    pub fn output_expression(&self) -> Option<&BoundExpression> {
        match &self.kind {
            VertexKind::Output(e) => Some(e),
            _ => None,
        }
    }
}

/// An immutable control-flow graph. Composition returns new values, so
/// callers may retain and reuse sub-graphs freely — a partially built
/// graph discarded during error recovery costs nothing downstream.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    vertices: IndexMap<VertexId, FlowVertex>,
    adjacency: IndexMap<VertexId, Vec<VertexId>>,
    start: Option<VertexId>,
}

impl FlowGraph {
    /// The graph with no vertices.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A one-vertex graph whose single outgoing edge is the sentinel.
    pub fn simple(vertex: FlowVertex) -> Self {
        Self::empty().add_vertex(vertex, vec![VertexId::EMPTY])
    }

    /// Add a new vertex with explicit outgoing edges. Becomes the start
    /// vertex if the graph was empty.
    pub fn add_vertex(&self, vertex: FlowVertex, successors: Vec<VertexId>) -> Self {
        assert!(
            !self.vertices.contains_key(&vertex.id),
            "internal invariant violated: vertex {:?} added twice",
            vertex.id
        );
        let mut next = self.clone();
        if next.start.is_none() {
            next.start = Some(vertex.id);
        }
        next.adjacency.insert(vertex.id, successors);
        next.vertices.insert(vertex.id, vertex);
        next
    }

    /// Sequential composition: every sentinel edge of `self` is rewired
    /// to `other`'s start vertex, and `other` is merged in untouched.
    pub fn append(&self, other: &FlowGraph) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let other_start = other.start.expect("non-empty graph has a start");
        let mut next = self.clone();
        for successors in next.adjacency.values_mut() {
            for successor in successors.iter_mut() {
                if successor.is_empty_sentinel() {
                    *successor = other_start;
                }
            }
        }
        next.merge_disjoint(other, None);
        next
    }

    /// Splice composition: redirect every edge pointing at `vertex` to
    /// `other`'s start, give `other`'s sentinel edges the continuation
    /// `vertex` had, and remove `vertex`. Replacing with the empty graph
    /// short-circuits the vertex out of the graph entirely.
    pub fn replace(&self, vertex: VertexId, other: &FlowGraph) -> Self {
        let continuation = self
            .adjacency
            .get(&vertex)
            .unwrap_or_else(|| {
                panic!("internal invariant violated: replacing absent vertex {vertex:?}")
            })
            .clone();

        let mut next = self.clone();
        next.vertices.shift_remove(&vertex);
        next.adjacency.shift_remove(&vertex);

        match other.start {
            Some(other_start) => {
                for successors in next.adjacency.values_mut() {
                    for successor in successors.iter_mut() {
                        if *successor == vertex {
                            *successor = other_start;
                        }
                    }
                }
                if next.start == Some(vertex) {
                    next.start = Some(other_start);
                }
                next.merge_disjoint(other, Some(&continuation));
            }
            None => {
                // Empty replacement: inbound edges flow straight to the
                // replaced vertex's own continuation.
                for successors in next.adjacency.values_mut() {
                    splice_in_place(successors, vertex, &continuation);
                }
                if next.start == Some(vertex) {
                    next.start = match continuation.as_slice() {
                        [single] if !single.is_empty_sentinel() => Some(*single),
                        [VertexId::EMPTY] => None,
                        _ => panic!(
                            "internal invariant violated: start vertex {vertex:?} replaced by empty graph with {} continuations",
                            continuation.len()
                        ),
                    };
                }
            }
        }
        next
    }

    /// Merge `other`'s vertices and edges, rewriting its sentinel edges
    /// to `continuation` when given. Ids must be disjoint: a collision
    /// means two sub-graphs of one scene were built from the same
    /// allocator state, which the builder never does.
    fn merge_disjoint(&mut self, other: &FlowGraph, continuation: Option<&[VertexId]>) {
        for (&id, vertex) in &other.vertices {
            assert!(
                !self.vertices.contains_key(&id),
                "internal invariant violated: vertex {id:?} appears in both graphs of a composition"
            );
            self.vertices.insert(id, vertex.clone());
        }
        for (&id, successors) in &other.adjacency {
            let mut successors = successors.clone();
            if let Some(continuation) = continuation {
                splice_in_place(&mut successors, VertexId::EMPTY, continuation);
            }
            self.adjacency.insert(id, successors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// The start vertex. `None` for the empty graph.
    pub fn start(&self) -> Option<VertexId> {
        self.start
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> &FlowVertex {
        self.vertices
            .get(&id)
            .unwrap_or_else(|| panic!("internal invariant violated: unknown vertex {id:?}"))
    }

    /// Ordered successor list of a vertex.
    pub fn successors(&self, id: VertexId) -> &[VertexId] {
        self.adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_else(|| panic!("internal invariant violated: unknown vertex {id:?}"))
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &FlowVertex> {
        self.vertices.values()
    }

    /// A copy of this graph with fresh vertex ids drawn from `fresh`,
    /// assigned in creation order. Used when inlining a scene's graph
    /// into a caller, where the callee's ids would otherwise collide.
    pub fn reindexed(&self, mut fresh: impl FnMut() -> VertexId) -> FlowGraph {
        let mut map: IndexMap<VertexId, VertexId> = IndexMap::with_capacity(self.vertices.len());
        for &id in self.vertices.keys() {
            map.insert(id, fresh());
        }
        let remap = |id: VertexId| {
            if id.is_empty_sentinel() {
                id
            } else {
                map[&id]
            }
        };
        let mut next = FlowGraph::empty();
        next.start = self.start.map(&remap);
        for (&id, vertex) in &self.vertices {
            let mut vertex = vertex.clone();
            vertex.id = remap(id);
            next.vertices.insert(vertex.id, vertex);
        }
        for (&id, successors) in &self.adjacency {
            next.adjacency
                .insert(remap(id), successors.iter().map(|&s| remap(s)).collect());
        }
        next
    }
}

/// Replace every occurrence of `target` in `successors` by splicing in
/// `replacement`, preserving order.
fn splice_in_place(successors: &mut Vec<VertexId>, target: VertexId, replacement: &[VertexId]) {
    if !successors.contains(&target) {
        return;
    }
    let mut spliced = Vec::with_capacity(successors.len() + replacement.len());
    for &successor in successors.iter() {
        if successor == target {
            spliced.extend_from_slice(replacement);
        } else {
            spliced.push(successor);
        }
    }
    *successors = spliced;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(id: u32) -> FlowVertex {
        FlowVertex::output(VertexId(id), BoundExpression::Text(format!("v{id}")))
    }

    #[test]
    fn test_simple_graph() {
        let g = FlowGraph::simple(out(0));
        assert_eq!(g.len(), 1);
        assert_eq!(g.start(), Some(VertexId(0)));
        assert_eq!(g.successors(VertexId(0)), &[VertexId::EMPTY]);
    }

    #[test]
    fn test_append_rewires_sentinels() {
        let g = FlowGraph::simple(out(0)).append(&FlowGraph::simple(out(1)));
        assert_eq!(g.successors(VertexId(0)), &[VertexId(1)]);
        assert_eq!(g.successors(VertexId(1)), &[VertexId::EMPTY]);
        assert_eq!(g.start(), Some(VertexId(0)));
    }

    #[test]
    fn test_append_empty_is_identity() {
        let g = FlowGraph::simple(out(0));
        let left = FlowGraph::empty().append(&g);
        let right = g.append(&FlowGraph::empty());
        assert_eq!(left.start(), g.start());
        assert_eq!(right.len(), g.len());
        assert_eq!(left.successors(VertexId(0)), g.successors(VertexId(0)));
    }

    #[test]
    #[should_panic(expected = "internal invariant violated")]
    fn test_append_rejects_shared_ids() {
        let g = FlowGraph::simple(out(0));
        let _ = g.append(&FlowGraph::simple(out(0)));
    }

    #[test]
    fn test_replace_inherits_continuation() {
        // 0 -> placeholder(1) -> 2, splice {3} in for 1.
        let g = FlowGraph::empty()
            .add_vertex(out(0), vec![VertexId(1)])
            .add_vertex(FlowVertex::connector(VertexId(1)), vec![VertexId(2)])
            .add_vertex(out(2), vec![VertexId::EMPTY]);
        let sub = FlowGraph::simple(out(3));
        let g = g.replace(VertexId(1), &sub);

        assert!(!g.contains(VertexId(1)));
        assert_eq!(g.successors(VertexId(0)), &[VertexId(3)]);
        // The spliced vertex inherited the placeholder's continuation.
        assert_eq!(g.successors(VertexId(3)), &[VertexId(2)]);
    }

    #[test]
    fn test_replace_with_empty_short_circuits() {
        let g = FlowGraph::empty()
            .add_vertex(out(0), vec![VertexId(1)])
            .add_vertex(FlowVertex::connector(VertexId(1)), vec![VertexId(2)])
            .add_vertex(out(2), vec![VertexId::EMPTY]);
        let g = g.replace(VertexId(1), &FlowGraph::empty());
        assert_eq!(g.successors(VertexId(0)), &[VertexId(2)]);
        assert!(!g.contains(VertexId(1)));
    }

    #[test]
    fn test_replace_redirects_all_aliased_slots() {
        // A decision vertex whose two slots alias one placeholder.
        let g = FlowGraph::empty()
            .add_vertex(
                FlowVertex::branch_on(VertexId(0), skein_ast::types::SymbolId(0)),
                vec![VertexId(1), VertexId(1)],
            )
            .add_vertex(FlowVertex::connector(VertexId(1)), vec![VertexId::EMPTY]);
        let g = g.replace(VertexId(1), &FlowGraph::simple(out(2)));
        assert_eq!(g.successors(VertexId(0)), &[VertexId(2), VertexId(2)]);
    }

    #[test]
    fn test_reindexed_preserves_shape() {
        let g = FlowGraph::simple(out(0)).append(&FlowGraph::simple(out(1)));
        let mut counter = 10u32;
        let h = g.reindexed(|| {
            let id = VertexId(counter);
            counter += 1;
            id
        });
        assert_eq!(h.start(), Some(VertexId(10)));
        assert_eq!(h.successors(VertexId(10)), &[VertexId(11)]);
        assert_eq!(h.successors(VertexId(11)), &[VertexId::EMPTY]);
        // The original is untouched.
        assert_eq!(g.start(), Some(VertexId(0)));
    }
}
