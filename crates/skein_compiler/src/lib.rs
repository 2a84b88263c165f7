//! skein_compiler: pipeline orchestration.
//!
//! Bind, build flow graphs, lower — one linear pass per scene. When any
//! error diagnostic was raised, no artifact is produced; the result is
//! the ordered diagnostic list alone.

use skein_ast::node::Module;
use skein_binder::Binder;
use skein_core::intern::NameInterner;
use skein_diagnostics::DiagnosticCollection;
use skein_flow::{allocate_registers, build_scenes};
use skein_lowering::{lower_program, LoweredProgram};
use thiserror::Error;

/// The user-visible failure: compilation did not succeed, and here is
/// the ordered list of positioned diagnostics saying why.
#[derive(Debug, Error)]
#[error("compilation did not succeed: {} error(s)", .diagnostics.error_count())]
pub struct CompileError {
    pub diagnostics: DiagnosticCollection,
}

/// The outcome of a compilation: the lowered tables when the script was
/// clean, and every diagnostic either way.
#[derive(Debug)]
pub struct CompileResult {
    pub program: Option<LoweredProgram>,
    pub diagnostics: DiagnosticCollection,
}

impl CompileResult {
    pub fn succeeded(&self) -> bool {
        self.program.is_some()
    }

    /// The artifact, or the diagnostics explaining its absence.
    pub fn into_program(self) -> Result<LoweredProgram, CompileError> {
        match self.program {
            Some(program) => Ok(program),
            None => Err(CompileError {
                diagnostics: self.diagnostics,
            }),
        }
    }
}

/// One story compilation: a syntax tree plus the interner that can
/// resolve its names.
pub struct Story {
    module: Module,
    interner: NameInterner,
}

impl Story {
    pub fn new(module: Module, interner: NameInterner) -> Self {
        Self { module, interner }
    }

    /// Run the full pipeline: bind -> build flow graphs -> lower.
    pub fn compile(&self) -> CompileResult {
        let binder = Binder::new(self.interner.clone());
        let bind = binder.bind_module(&self.module);
        let mut diagnostics = bind.diagnostics;
        diagnostics.sort();

        if diagnostics.has_errors() {
            return CompileResult {
                program: None,
                diagnostics,
            };
        }

        let graphs = build_scenes(&bind.module);
        let registers = allocate_registers(&bind.module, &bind.symbols);
        let program = lower_program(&bind.module, &bind.symbols, &self.interner, &graphs, &registers);

        CompileResult {
            program: Some(program),
            diagnostics,
        }
    }
}

/// Convenience entry point for one-shot compilation.
pub fn compile(module: Module, interner: NameInterner) -> CompileResult {
    Story::new(module, interner).compile()
}
