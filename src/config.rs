//! CLI configuration via args and environment variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Validate and inspect machine-parsable HTTP error bodies.
#[derive(Parser, Debug, Clone)]
#[command(name = "causeway", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Log level.
    #[arg(long, global = true, default_value = "warn", env = "CAUSEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, global = true, default_value = "text", env = "CAUSEWAY_LOG_FORMAT")]
    pub log_format: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the JSON Schema of the error body.
    Schema,

    /// Validate error bodies read from files or stdin.
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Files holding one error body each. `-` or none reads stdin.
    pub files: Vec<PathBuf>,

    /// Status the bodies are sent with. Must be 4xx or 5xx. Echoed in each report.
    #[arg(long)]
    pub status: Option<u16>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
