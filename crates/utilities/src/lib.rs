#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

#[macro_use]
mod cast_macro;

mod debug_trace;
mod error;
mod generational_index;
mod no_hasher;
mod random_test;
mod test_logger;

pub use error::*;
pub use generational_index::*;
pub use no_hasher::*;
pub use random_test::*;
pub use test_logger::*;
