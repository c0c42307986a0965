//! causeway CLI: validates error bodies and prints their schema.
//!
//! The translation layer itself lives in `causeway-core`; this crate only
//! exposes it on the command line.

pub mod config;
pub mod error;
pub mod validate;

use std::io::{Read, Write};
use std::process::ExitCode;

use causeway_core::error_body_schema;

use config::{Command, ValidateArgs};
use error::CliError;
use validate::Input;

/// Result of a successful command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// At least one body failed validation.
    Invalid,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Invalid => ExitCode::FAILURE,
        }
    }
}

/// Runs `command`, reading stdin and writing results to `out`.
pub fn run(
    command: &Command,
    stdin: &mut dyn Read,
    out: &mut dyn Write,
) -> Result<Outcome, CliError> {
    match command {
        Command::Schema => {
            serde_json::to_writer_pretty(&mut *out, &error_body_schema())?;
            writeln!(out)?;
            Ok(Outcome::Success)
        }
        Command::Validate(args) => run_validate(args, stdin, out),
    }
}

fn run_validate(
    args: &ValidateArgs,
    stdin: &mut dyn Read,
    out: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let status = validate::check_status(args.status)?;
    if let Some(status) = status {
        tracing::debug!(status = status.as_u16(), "validating bodies for status");
    }

    let inputs: Vec<Input> = if args.files.is_empty() {
        vec![Input::Stdin]
    } else {
        args.files.iter().map(|path| Input::from_arg(path)).collect()
    };

    let reports = validate::validate_all(&inputs, status, stdin)?;
    validate::write_reports(&reports, args.json, out)?;

    let invalid = reports.iter().filter(|r| !r.valid).count();
    if invalid == 0 {
        Ok(Outcome::Success)
    } else {
        tracing::info!(invalid, total = reports.len(), "invalid error bodies found");
        Ok(Outcome::Invalid)
    }
}
