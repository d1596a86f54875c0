pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod prompt;
pub mod sources;
pub mod stats;
pub mod verify;
pub mod version;
pub mod wizard;

use std::{
    process::{self, ExitCode},
    thread,
};

use tokio::runtime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit status for an operator abort at a prompt.
pub const EXIT_INTERRUPTED: u8 = 130;

pub fn get_error_chain(err: &anyhow::Error) -> String {
    err.chain()
        .rev()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" => ")
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report_interrupt() -> u8 {
    println!("\n{}", error::ReleaseError::Interrupted);
    EXIT_INTERRUPTED
}

/// Prints `err` and picks the matching exit status.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    if error::ReleaseError::is_interrupt(err) {
        return ExitCode::from(report_interrupt());
    }

    eprintln!("\nError: {}", get_error_chain(err));
    ExitCode::FAILURE
}

/// Ends the process like an aborted prompt when Ctrl-C arrives, even while
/// the main thread is blocked reading the terminal.
pub fn exit_on_interrupt() -> anyhow::Result<()> {
    let rt = runtime::Builder::new_current_thread().enable_io().build()?;

    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || match rt.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => process::exit(report_interrupt().into()),
            Err(err) => warn!("cannot listen for Ctrl-C: {err}"),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;

    #[test]
    fn error_chain_reads_root_cause_first() {
        let err = Err::<(), _>(anyhow!("connection refused"))
            .context("fetching releases")
            .unwrap_err();
        assert_eq!(get_error_chain(&err), "connection refused => fetching releases");
    }

    #[test]
    fn interrupt_is_found_under_context() {
        let err = Err::<(), _>(anyhow::Error::from(error::ReleaseError::Interrupted))
            .context("selecting version")
            .unwrap_err();
        assert!(error::ReleaseError::is_interrupt(&err));
        assert!(!error::ReleaseError::is_interrupt(&anyhow!("boom")));
    }

    #[test]
    fn interrupt_exits_with_130() {
        let err = anyhow::Error::from(error::ReleaseError::Interrupted).context("reading answer");
        assert_eq!(report_failure(&err), ExitCode::from(130));
        assert_eq!(report_failure(&anyhow!("boom")), ExitCode::FAILURE);
    }
}
