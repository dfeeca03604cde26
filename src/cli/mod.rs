//! CLI module for the registry synthesizer.
//!
//! This module provides the command-line interface for validating,
//! rendering and persisting registry server configuration.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StoreArgs, StoreBackend};
pub use output::OutputFormatter;
