//! Command-line interface for route-forge.
//!
//! Provides commands for dataset generation, the sample service, and
//! training split export.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
