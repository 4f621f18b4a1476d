//! Compiles the match tree of every head symbol into a small bytecode
//! [Program] that is verified before it is executed by the dispatch loop of
//! the [crate::CompilingRewriter].
//!
#![forbid(unsafe_code)]

mod analysis;
mod compiler;
mod program;
mod verify;
mod vm;

pub use analysis::*;
pub use compiler::*;
pub use program::*;
pub use verify::*;
