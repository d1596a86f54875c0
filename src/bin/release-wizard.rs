//! Interactive release wizard for the desktop app.
//!
//! Bumps the version in `tauri.conf.json`, `src-tauri/Cargo.toml` and
//! `package.json` together, then optionally commits, pushes and tags.

use std::{io, process::ExitCode};

use amberize_release::{
    command::SystemRunner,
    config::CommonArgs,
    exit_on_interrupt, init_logging,
    prompt::{Answer, Console},
    report_failure,
    version::TargetChoice,
    wizard::{StagePolicy, Wizard},
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about = "Synchronize desktop version metadata and drive the release")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Answer yes to every confirmation.
    #[arg(short, long)]
    yes: bool,

    /// Continue even when the worktree has local changes.
    #[arg(long)]
    allow_dirty: bool,

    /// Version to release: patch, minor, major, keep or an explicit X.Y.Z.
    #[arg(long, value_name = "CHOICE")]
    bump: Option<TargetChoice>,

    /// Stop after writing the version files.
    #[arg(long)]
    no_commit: bool,

    #[arg(long)]
    no_push: bool,

    #[arg(long)]
    no_tag: bool,
}

impl Cli {
    fn policy(&self) -> StagePolicy {
        let base = if self.yes {
            StagePolicy::assume_yes()
        } else {
            StagePolicy::default()
        };

        StagePolicy {
            allow_dirty: Answer::from_flags(self.yes || self.allow_dirty, false),
            commit: Answer::from_flags(self.yes, self.no_commit),
            push: Answer::from_flags(self.yes, self.no_push),
            tag: Answer::from_flags(self.yes, self.no_tag),
            target: self.bump.clone(),
            ..base
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    if let Err(err) = exit_on_interrupt() {
        return report_failure(&err);
    }

    let layout = cli.common.layout();
    let runner = SystemRunner;
    let console = Console::new(io::stdin().lock(), io::stdout());
    let mut wizard = Wizard::new(&layout, &cli.common.repo, &runner, console, cli.policy());

    match wizard.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}
