//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Whaleprint - plan and apply Docker stack bundles.
#[derive(Parser, Debug)]
#[command(name = "whaleprint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Docker daemon address, e.g. `tcp://127.0.0.1:2375`.
    #[arg(long, global = true, env = "DOCKER_HOST")]
    pub docker_host: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Which bundle a command works on.
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Stack name; loads `<STACK>.dab` unless `--file` is given.
    pub stack: Option<String>,

    /// Bundle file to use; the stack is named after the file.
    #[arg(short, long)]
    pub file: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the execution plan for a stack.
    Plan {
        /// Bundle selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Show all properties instead of changes only.
        #[arg(long)]
        detail: bool,

        /// Process the named services only (fully-qualified, repeatable).
        #[arg(long = "target", value_name = "NAME")]
        targets: Vec<String>,
    },

    /// Apply the execution plan for a stack.
    Apply {
        /// Bundle selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Process the named services only (fully-qualified, repeatable).
        #[arg(long = "target", value_name = "NAME")]
        targets: Vec<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove the bundle's services from the swarm.
    Destroy {
        /// Bundle selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// List the stack's services and published ports.
    Output {
        /// Bundle selection.
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Export every live stack as a bundle file.
    Export {
        /// Directory to write bundles into.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Validate a bundle without contacting the swarm.
    Validate {
        /// Bundle selection.
        #[command(flatten)]
        stack: StackArgs,

        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
