//! The `validate` command: checks error bodies against the schema.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use causeway_core::{ErrorBody, StatusCode, is_error_status};
use serde::Serialize;

use crate::error::CliError;

/// Where a body is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    pub fn from_arg(path: &Path) -> Self {
        if path == Path::new("-") {
            Self::Stdin
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validation result of one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub source: String,
    pub valid: bool,
    /// The status the body was checked for, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn of(source: impl Into<String>, bytes: &[u8]) -> Self {
        let source = source.into();
        match ErrorBody::from_wire(bytes) {
            Ok(body) => Self {
                source,
                valid: true,
                status: None,
                exception_id: Some(body.exception_id().to_string()),
                error: None,
            },
            Err(e) => Self {
                source,
                valid: false,
                status: None,
                exception_id: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn with_status(mut self, status: Option<StatusCode>) -> Self {
        self.status = status.map(|s| s.as_u16());
        self
    }
}

/// Checks `status`, when given, before any body is read.
pub fn check_status(status: Option<u16>) -> Result<Option<StatusCode>, CliError> {
    let Some(code) = status else {
        return Ok(None);
    };
    match StatusCode::from_u16(code) {
        Ok(status) if is_error_status(status) => Ok(Some(status)),
        _ => Err(CliError::NotAnErrorStatus(code)),
    }
}

/// Reads and validates every input, in order. Each report records `status`.
pub fn validate_all(
    inputs: &[Input],
    status: Option<StatusCode>,
    stdin: &mut dyn Read,
) -> Result<Vec<Report>, CliError> {
    inputs
        .iter()
        .map(|input| -> Result<Report, CliError> {
            let bytes = read_input(input, stdin)?;
            let report = Report::of(input.to_string(), &bytes).with_status(status);
            tracing::debug!(source = %report.source, valid = report.valid, "validated error body");
            Ok(report)
        })
        .collect()
}

fn read_input(input: &Input, stdin: &mut dyn Read) -> Result<Vec<u8>, CliError> {
    match input {
        Input::Stdin => {
            let mut bytes = Vec::new();
            stdin
                .read_to_end(&mut bytes)
                .map_err(|source| CliError::Io {
                    path: "<stdin>".into(),
                    source,
                })?;
            Ok(bytes)
        }
        Input::File(path) => std::fs::read(path).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Writes the reports as text lines or as a JSON array.
pub fn write_reports(reports: &[Report], json: bool, out: &mut dyn Write) -> Result<(), CliError> {
    if json {
        serde_json::to_writer_pretty(&mut *out, reports)?;
        writeln!(out)?;
        return Ok(());
    }
    for report in reports {
        match (&report.exception_id, &report.error) {
            (Some(id), _) => match report.status {
                Some(status) => writeln!(out, "{}: ok ({id}, status {status})", report.source)?,
                None => writeln!(out, "{}: ok ({id})", report.source)?,
            },
            (None, Some(error)) => writeln!(out, "{}: invalid: {error}", report.source)?,
            (None, None) => writeln!(out, "{}: invalid", report.source)?,
        }
    }
    Ok(())
}
