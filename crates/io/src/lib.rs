#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod bitstream;
mod format;

pub use bitstream::*;
pub use format::*;
