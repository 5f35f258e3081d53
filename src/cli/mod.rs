//! CLI module for the Turbot provider.
//!
//! This module provides the command-line interface for managing Turbot
//! workspace resources.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
