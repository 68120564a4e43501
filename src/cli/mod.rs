//! Command-line interface for whaleprint.
//!
//! Argument parsing lives in `commands`, rendering of plans and reports in
//! `output`.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StackArgs};
pub use output::{DEFAULT_COLUMN, OutputFormatter, RenderConfig};
