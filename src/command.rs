use std::{path::Path, process::Command};

use anyhow::Context;
use tracing::debug;

use crate::error::ReleaseError;

/// Runs external tools (`gh`, `git`, `npm`). Returns trimmed stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> anyhow::Result<String>;
}

/// Runs commands on the host, resolving programs through `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> anyhow::Result<String> {
        let command_line = format_command(program, args);
        let resolved =
            which::which(program).map_err(|_| ReleaseError::ToolMissing(program.to_string()))?;

        debug!(command = %command_line, cwd = ?cwd, "running");
        let mut command = Command::new(resolved);
        command.args(args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .with_context(|| format!("trying to run `{command_line}`"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReleaseError::CommandFailed {
                command: command_line,
                message: failure_message(&stderr, &stdout),
            }
            .into());
        }

        Ok(stdout.trim().to_string())
    }
}

pub fn format_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// stderr wins over stdout, and something is always reported.
fn failure_message(stderr: &str, stdout: &str) -> String {
    [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or("unknown command error")
        .to_string()
}
