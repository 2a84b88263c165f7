//! skein_lowering: flattening flow graphs into integer state tables.
//!
//! Assigns canonical state numbers to every flow vertex in creation
//! order and materializes the transition, output, and options tables
//! the external emitter transcribes. Also home of [`machine::StoryMachine`],
//! the in-memory executor of those tables that the generated artifact
//! mirrors.

pub mod lower;
pub mod machine;
pub mod tables;

pub use lower::{lower_program, lower_scene};
pub use machine::StoryMachine;
pub use tables::*;
