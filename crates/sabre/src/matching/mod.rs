//! This module contains the match trees that select the rewrite rule that
//! applies to a term, and the additional constraints around matching such as
//! non-linear left-hand sides and guards.
//!
#![forbid(unsafe_code)]

mod announcement;
mod match_tree;
mod nonlinear;

pub use announcement::*;
pub use match_tree::*;
pub use nonlinear::*;
