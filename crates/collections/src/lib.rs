#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod indexed_set;
mod protection_set;

pub use hashbrown::Equivalent;
pub use indexed_set::*;
pub use protection_set::*;
