//! The storage of terms and function symbols.
//!
//! An aterm is a first-order term of the following form:
//!
//! t := c | f(t1, ..., tn) | u64
//!
//! where `f` is a function symbol with arity `n > 0` and a unique name, `c` is
//! a constant and `u64` is a numerical term.
//!
//! Terms are stored maximally shared in a [TermPool], meaning that two terms
//! are structurally equal if and only if they have the same index. The pool
//! performs garbage collection to remove terms that are no longer reachable.

mod shared_term;
mod symbol_pool;
mod term_pool;

pub use shared_term::*;
pub use symbol_pool::*;
pub use term_pool::*;
