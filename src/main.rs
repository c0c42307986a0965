//! causeway entry point.

use std::io;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use causeway::config::Config;

fn main() -> ExitCode {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "causeway starting");

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    match causeway::run(&config.command, &mut stdin, &mut stdout) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("causeway: {e}");
            ExitCode::from(2)
        }
    }
}
