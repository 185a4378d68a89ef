extern crate self as chainstore_core;

pub mod log;
pub mod panic;

pub use ::log::{debug, error, info, trace, warn};
