#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod bits_for_value;
mod u64_variablelength;

pub use bits_for_value::*;
pub use u64_variablelength::*;
