//! skein_core: shared infrastructure for the skein compiler.
//!
//! Source positions, line maps, and string interning. Every other crate
//! in the workspace builds on these types.

pub mod intern;
pub mod text;
