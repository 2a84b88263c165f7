//! skein_binder: name resolution, symbol tables, and validation.
//!
//! Turns a syntax tree into a bound tree plus a frozen symbol table, or
//! a list of positioned diagnostics. Binding never aborts on the first
//! problem: unresolved names become error placeholders so every
//! independent mistake in a script is reported in one run.

pub mod binder;
pub mod bound;
pub mod symbol;

pub use binder::{BindResult, Binder};
pub use bound::*;
pub use symbol::*;
