//! Command-line interface
//!
//! One binary serves both cold-wallet roles; `--role` selects which
//! facade backs the invocation.

pub mod commands;

pub use commands::{AppState, CliResult, FileKeyImporter};
