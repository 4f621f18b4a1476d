#![doc = include_str!("../README.md")]

mod compiling_rewriter;
mod innermost_rewriter;
mod matching;
mod rewrite_engine;
mod rewrite_specification;
mod rule_set;
mod variable;

pub mod compiling;
pub mod test_utility;
pub mod utilities;

pub use compiling_rewriter::*;
pub use innermost_rewriter::*;
pub use matching::*;
pub use rewrite_engine::*;
pub use rewrite_specification::*;
pub use rule_set::*;
pub use variable::*;
