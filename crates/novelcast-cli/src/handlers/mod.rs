//! Command handlers.
//!
//! Each handler is a thin `execute` function: validate CLI input, call into
//! the library crates, format output for the terminal.

pub mod follow;
pub mod serve;
pub mod speak;
pub mod voices;
