//! Command line entry points
//!
//! - `serve`: run the registry HTTP API
//! - `format`: format a stored prompt by URI
//! - `variables`: list the placeholders of a template

pub mod format;
pub mod serve;
pub mod variables;

use clap::{Parser, Subcommand};

/// Prompt registry: versioned prompt templates with aliases
#[derive(Parser)]
#[command(name = "prompt-registry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Format a stored prompt, e.g. `format prompts:/greeting@production --var name=Ada`
    Format(format::FormatArgs),

    /// Print the variables referenced by a template
    Variables(variables::VariablesArgs),
}
