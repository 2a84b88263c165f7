//! The lowering pass: one finished flow graph in, one state table out.
//!
//! Canonical ids are the rank of each surviving vertex in creation
//! order, so recompiling unchanged source yields identical numbering.
//! Any sentinel edge left after composition is the scene's own
//! continuation and lowers to [`StateId::FINISHED`]; every other
//! irregularity (a dangling edge, a branch without a register) is a
//! defect in the compiler and panics with a labeled message.

use crate::tables::*;
use rustc_hash::FxHashMap;
use skein_ast::types::{OutcomeFlags, SymbolId};
use skein_binder::{BoundExpression, BoundModule, SymbolTable};
use skein_core::intern::NameInterner;
use skein_flow::{FlowGraph, RegisterAllocation, VertexId, VertexKind};

/// Lower every scene of a bound module.
pub fn lower_program(
    module: &BoundModule,
    symbols: &SymbolTable,
    interner: &NameInterner,
    graphs: &FxHashMap<SymbolId, FlowGraph>,
    registers: &RegisterAllocation,
) -> LoweredProgram {
    let scenes = module
        .scenes
        .iter()
        .map(|scene| {
            let graph = graphs.get(&scene.symbol).unwrap_or_else(|| {
                panic!("internal invariant violated: scene {} was never built", scene.symbol.0)
            });
            lower_scene(scene.symbol, graph, symbols, interner, registers)
        })
        .collect();
    LoweredProgram {
        scenes,
        registers: register_table(symbols, interner, registers),
    }
}

/// Lower one scene's finished graph to its flat state table.
pub fn lower_scene(
    scene: SymbolId,
    graph: &FlowGraph,
    symbols: &SymbolTable,
    interner: &NameInterner,
    registers: &RegisterAllocation,
) -> LoweredScene {
    let symbol = symbols.get(scene);
    let is_chapter = symbol
        .as_scene()
        .unwrap_or_else(|| panic!("internal invariant violated: lowering a non-scene symbol"))
        .is_chapter;
    let name = interner.resolve(symbol.name).to_string();

    // Canonical numbering: surviving vertices ranked by creation order.
    let mut vertex_ids: Vec<VertexId> = graph.vertices().map(|v| v.id).collect();
    vertex_ids.sort();
    let state_of: FxHashMap<VertexId, StateId> = vertex_ids
        .iter()
        .enumerate()
        .map(|(rank, &id)| (id, StateId(rank as u32)))
        .collect();
    let target = |id: VertexId| -> StateId {
        if id.is_empty_sentinel() {
            StateId::FINISHED
        } else {
            *state_of.get(&id).unwrap_or_else(|| {
                panic!("internal invariant violated: edge to unknown vertex {:?}", id)
            })
        }
    };

    let mut states = Vec::with_capacity(vertex_ids.len());
    for &id in &vertex_ids {
        let vertex = graph.vertex(id);
        let successors = graph.successors(id);
        let single = |successors: &[VertexId]| -> StateId {
            match successors {
                [next] => target(*next),
                _ => panic!(
                    "internal invariant violated: vertex {:?} has {} successors, expected 1",
                    id,
                    successors.len()
                ),
            }
        };
        let state = match &vertex.kind {
            VertexKind::Output(expression) => LoweredState {
                id: state_of[&id],
                output: Some(materialize(expression, symbols, interner)),
                options: Vec::new(),
                effect: None,
                transition: Transition::Continue(single(successors)),
            },
            VertexKind::Connector => LoweredState {
                id: state_of[&id],
                output: None,
                options: Vec::new(),
                effect: None,
                transition: Transition::Continue(single(successors)),
            },
            VertexKind::Assign { outcome, option } => LoweredState {
                id: state_of[&id],
                output: None,
                options: Vec::new(),
                // An assignment to an outcome nothing reads and nobody
                // can see has no register; the state degenerates to a
                // pure continue.
                effect: registers.register_for(*outcome).map(|register| RegisterWrite {
                    register,
                    value: *option,
                }),
                transition: Transition::Continue(single(successors)),
            },
            VertexKind::Choice(labels) => LoweredState {
                id: state_of[&id],
                output: None,
                options: labels
                    .iter()
                    .map(|l| materialize(l, symbols, interner))
                    .collect(),
                effect: None,
                transition: Transition::ByOption(successors.iter().map(|&s| target(s)).collect()),
            },
            VertexKind::BranchOn(outcome) => {
                let register = registers.register_for(*outcome).unwrap_or_else(|| {
                    panic!("internal invariant violated: branch on unregistered outcome")
                });
                LoweredState {
                    id: state_of[&id],
                    output: None,
                    options: Vec::new(),
                    effect: None,
                    transition: Transition::ByRegister {
                        register,
                        targets: successors.iter().map(|&s| target(s)).collect(),
                    },
                }
            }
        };
        states.push(state);
    }

    LoweredScene {
        name,
        is_chapter,
        start: graph.start().map(target).unwrap_or(StateId::FINISHED),
        states,
    }
}

fn register_table(
    symbols: &SymbolTable,
    interner: &NameInterner,
    registers: &RegisterAllocation,
) -> Vec<RegisterInfo> {
    registers
        .symbols()
        .iter()
        .map(|&id| {
            let symbol = symbols.get(id);
            let outcome = symbol
                .as_outcome()
                .unwrap_or_else(|| panic!("internal invariant violated: register over non-outcome"));
            RegisterInfo {
                name: interner.resolve(symbol.name).to_string(),
                options: outcome
                    .options
                    .iter()
                    .map(|&o| interner.resolve(o).to_string())
                    .collect(),
                public: outcome.flags.contains(OutcomeFlags::PUBLIC),
                default: outcome.default,
                intervals: outcome.intervals.as_ref().map(|intervals| {
                    intervals
                        .iter()
                        .map(|i| IntervalInfo {
                            option: i.option,
                            numerator: i.upper.numerator,
                            denominator: i.upper.denominator,
                            inclusive: i.inclusive,
                        })
                        .collect()
                }),
            }
        })
        .collect()
}

/// Materialize a bound expression into the self-contained payload the
/// tables carry. Error placeholders only exist alongside an error
/// diagnostic, and no artifact is lowered then.
fn materialize(
    expression: &BoundExpression,
    symbols: &SymbolTable,
    interner: &NameInterner,
) -> OutputValue {
    match expression {
        BoundExpression::Text(value) => OutputValue::Text(value.clone()),
        BoundExpression::Number(value) => OutputValue::Number(*value),
        BoundExpression::Flag(value) => OutputValue::Flag(*value),
        BoundExpression::EnumMember { enum_symbol, member } => {
            let symbol = symbols.get(*enum_symbol);
            let members = &symbol
                .as_enum()
                .unwrap_or_else(|| panic!("internal invariant violated: enum member of non-enum"))
                .members;
            OutputValue::EnumMember {
                enum_name: interner.resolve(symbol.name).to_string(),
                member: interner.resolve(members[*member as usize]).to_string(),
            }
        }
        BoundExpression::Record { record, fields } => {
            let symbol = symbols.get(*record);
            let properties = &symbol
                .as_record()
                .unwrap_or_else(|| panic!("internal invariant violated: record creation of non-record"))
                .properties;
            OutputValue::Record {
                record: interner.resolve(symbol.name).to_string(),
                fields: properties
                    .iter()
                    .zip(fields)
                    .map(|(property, field)| {
                        (
                            interner.resolve(property.name).to_string(),
                            materialize(field, symbols, interner),
                        )
                    })
                    .collect(),
            }
        }
        BoundExpression::Invoke {
            reference,
            method,
            arguments,
        } => {
            let reference_symbol = symbols.get(*reference);
            let interface = symbols.get(
                reference_symbol
                    .as_reference()
                    .unwrap_or_else(|| panic!("internal invariant violated: invoke on non-reference"))
                    .interface,
            );
            let method_name = interface
                .as_interface()
                .unwrap_or_else(|| panic!("internal invariant violated: reference to non-interface"))
                .methods[*method as usize]
                .name;
            OutputValue::Invoke {
                reference: interner.resolve(reference_symbol.name).to_string(),
                method: interner.resolve(method_name).to_string(),
                arguments: arguments
                    .iter()
                    .map(|a| materialize(a, symbols, interner))
                    .collect(),
            }
        }
        BoundExpression::Error => {
            panic!("internal invariant violated: error expression survived to lowering")
        }
    }
}
