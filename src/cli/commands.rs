//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::resources::ResourceKind;

/// turbot - Declarative management of Turbot workspace resources.
#[derive(Parser, Debug)]
#[command(name = "turbot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "TURBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Generate and display the execution plan.
    Plan {
        /// Show field-level changes.
        #[arg(short, long)]
        detailed: bool,

        /// Plan against recorded state without reading the workspace.
        #[arg(long)]
        no_refresh: bool,
    },

    /// Apply the configuration to the workspace.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue on errors.
        #[arg(long)]
        continue_on_error: bool,

        /// Skip reading the workspace before planning.
        #[arg(long)]
        no_refresh: bool,
    },

    /// Re-read every managed resource from the workspace.
    Refresh,

    /// Bring an existing workspace entity under management.
    Import {
        /// Name to record the resource under.
        name: String,

        /// Resource kind (file, grant, `smart_folder_attachment`).
        kind: ResourceKind,

        /// Remote id; `<smart_folder>_<resource>` for attachments.
        id: String,
    },

    /// Destroy all managed resources.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Check for drift between config, state and the workspace.
    Drift,

    /// Manage local state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show current state.
    Show,

    /// List managed resources.
    List,

    /// Stop managing a resource without deleting it.
    Rm {
        /// Resource name.
        name: String,
    },

    /// Unlock the state.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Force unlock (dangerous).
        #[arg(long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
