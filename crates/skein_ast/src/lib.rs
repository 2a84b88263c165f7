//! skein_ast: the syntax tree of the skein scripting language.
//!
//! One closed sum type per syntax category (declaration, statement,
//! expression); each variant carries only its own fields plus the source
//! span it came from. Trees are produced by an external parser or by
//! `skein_nodebuilder`, and consumed by the binder.

pub mod fraction;
pub mod node;
pub mod types;

pub use fraction::Fraction;
pub use node::*;
pub use types::*;
