//! Errors of the `causeway` CLI.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("status {0} is not a 4xx or 5xx HTTP status")]
    NotAnErrorStatus(u16),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
