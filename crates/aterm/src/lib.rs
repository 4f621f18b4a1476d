#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod aterm;
mod aterm_balanced_tree;
mod aterm_binary_stream;
mod aterm_int;
mod aterm_list;
mod markable;
mod parse_term;
mod protected;
mod random_term;
mod symbol;

pub mod storage;

pub use aterm::*;
pub use aterm_balanced_tree::*;
pub use aterm_binary_stream::*;
pub use aterm_int::*;
pub use aterm_list::*;
pub use markable::*;
pub use parse_term::*;
pub use protected::*;
pub use random_term::*;
pub use storage::TermPool;
pub use storage::TermPoolConfig;
pub use storage::TermPoolError;
pub use storage::TermPoolMetrics;
pub use symbol::*;
