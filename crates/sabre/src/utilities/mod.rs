mod innermost_stack;
mod position;
mod substitution;
mod term_template;

pub use innermost_stack::*;
pub use position::*;
pub use substitution::*;
pub use term_template::*;
