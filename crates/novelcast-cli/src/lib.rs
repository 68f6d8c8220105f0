//! novelcast command-line interface.
//!
//! The binary is the composition root: it loads `.env`, initialises
//! logging, and dispatches to one handler per subcommand.

#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;

// Used by the binary entry point only
use dotenvy as _;
use tracing_subscriber as _;

pub mod commands;
pub mod handlers;
pub mod parser;

pub use commands::Commands;
pub use parser::Cli;
