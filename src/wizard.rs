//! Interactive release flow: synchronize the version sources, then commit,
//! push and tag.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use anyhow::Context;
use tracing::info;

use crate::{
    command::CommandRunner,
    config::ProjectLayout,
    git::{tag_name, Git},
    prompt::{Answer, Console},
    sources::{VersionSet, VersionState},
    version::TargetChoice,
};

pub const REQUIRED_TOOLS: [&str; 2] = ["git", "npm"];

/// Preset answers, one per confirmable stage. `Answer::Ask` reads the terminal.
#[derive(Debug, Clone, Default)]
pub struct StagePolicy {
    pub allow_dirty: Answer,
    pub use_canonical: Answer,
    pub apply: Answer,
    pub commit: Answer,
    pub push: Answer,
    pub tag: Answer,
    /// Skips the version menu when set.
    pub target: Option<TargetChoice>,
}

impl StagePolicy {
    /// Every confirmation answered with yes.
    pub fn assume_yes() -> Self {
        Self {
            allow_dirty: Answer::Yes,
            use_canonical: Answer::Yes,
            apply: Answer::Yes,
            commit: Answer::Yes,
            push: Answer::Yes,
            tag: Answer::Yes,
            target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operator said no before anything was written.
    Declined,
    /// Versions were written; `committed`/`pushed`/`tagged` say how far the
    /// git flow went.
    Released {
        version: String,
        committed: bool,
        pushed: bool,
        tagged: bool,
    },
}

pub struct Wizard<'a, R, W> {
    layout: &'a ProjectLayout,
    repo: &'a str,
    runner: &'a dyn CommandRunner,
    console: Console<R, W>,
    policy: StagePolicy,
}

impl<'a, R: BufRead, W: Write> Wizard<'a, R, W> {
    pub fn new(
        layout: &'a ProjectLayout,
        repo: &'a str,
        runner: &'a dyn CommandRunner,
        console: Console<R, W>,
        policy: StagePolicy,
    ) -> Self {
        Self {
            layout,
            repo,
            runner,
            console,
            policy,
        }
    }

    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    pub fn run(&mut self) -> anyhow::Result<Outcome> {
        let git = Git::new(self.runner, &self.layout.root);
        let versions = VersionSet::desktop(self.layout, self.runner);

        ensure_required_tools(self.runner)?;
        if !self.guard_clean_worktree(&git)? {
            self.console.say("No files changed.")?;
            return Ok(Outcome::Declined);
        }

        let current = versions.read_state()?;
        self.print_version_state(&current)?;

        let base = current.canonical().to_string();
        if !current.is_synchronized() {
            self.console.say("\nVersion files are not synchronized.")?;
            let question = format!(
                "Use {} as canonical base version and continue?",
                current.canonical_label()
            );
            if !self
                .console
                .confirm(&question, true, self.policy.use_canonical)?
            {
                self.console.say("No files changed.")?;
                return Ok(Outcome::Declined);
            }
        }

        let target = match &self.policy.target {
            Some(choice) => choice.resolve(&base)?,
            None => self.console.select_target_version(&base)?,
        };
        self.console.say(format!("\nTarget version: {target}"))?;
        if !self
            .console
            .confirm("Apply version changes now?", true, self.policy.apply)?
        {
            self.console.say("No files changed.")?;
            return Ok(Outcome::Declined);
        }

        let updated = match versions.apply(&target) {
            Ok(state) => state,
            Err(err) => {
                // show what is on disk before giving up
                if let Ok(state) = versions.read_state() {
                    self.print_version_state(&state)?;
                }
                return Err(err);
            }
        };
        self.print_version_state(&updated)?;

        let mut outcome = Outcome::Released {
            version: target.clone(),
            committed: false,
            pushed: false,
            tagged: false,
        };

        if self
            .console
            .confirm("Create release commit now?", true, self.policy.commit)?
        {
            let mut paths: Vec<&Path> = versions
                .paths()
                .map(|path| self.layout.relative(path))
                .collect();
            paths.push(self.layout.relative(&self.layout.package_lock));
            git.commit_release(&paths, &target)?;
            self.console.say("Release commit created.")?;

            let pushed = if self
                .console
                .confirm("Push branch to origin?", true, self.policy.push)?
            {
                let branch = git.push_branch()?;
                info!(%branch, "pushed branch");
                self.console.say("Branch pushed.")?;
                true
            } else {
                false
            };

            let tag = tag_name(&target);
            let tagged = if self.console.confirm(
                &format!("Create and push tag {tag}?"),
                true,
                self.policy.tag,
            )? {
                git.create_and_push_tag(&target)?;
                self.console.say(format!("Tag {tag} pushed."))?;
                true
            } else {
                false
            };

            outcome = Outcome::Released {
                version: target.clone(),
                committed: true,
                pushed,
                tagged,
            };
        }

        self.print_next_steps(&target)?;
        Ok(outcome)
    }

    /// `false` when the tree is dirty and the operator does not override.
    fn guard_clean_worktree(&mut self, git: &Git) -> anyhow::Result<bool> {
        if git.is_clean()? {
            return Ok(true);
        }

        self.console.say("\nDetected local changes in the worktree.")?;
        self.console.say("Release tagging is safer from a clean state.")?;
        self.console
            .confirm("Continue anyway?", false, self.policy.allow_dirty)
    }

    fn print_version_state(&mut self, state: &VersionState) -> anyhow::Result<()> {
        self.console.say("\nCurrent desktop version metadata:")?;
        for reading in &state.readings {
            self.console
                .say(format!("  - {}: {}", reading.label, reading.version))?;
        }
        let synchronized = if state.is_synchronized() { "yes" } else { "no" };
        self.console.say(format!("  - synchronized: {synchronized}"))
    }

    fn print_next_steps(&mut self, version: &str) -> anyhow::Result<()> {
        let tag = tag_name(version);
        self.console.say("\nRelease wizard completed.")?;
        self.console.say("Recommended next steps:")?;
        self.console
            .say(format!("  1) Confirm Actions workflow ran for tag {tag}."))?;
        self.console
            .say("  2) Publish the draft GitHub release when all jobs pass.")?;
        self.console.say("  3) Validate updater JSON endpoint:")?;
        self.console.say(format!(
            "     https://github.com/{}/releases/latest/download/latest.json",
            self.repo
        ))?;
        self.console
            .say("  4) Run release-verify for post-release verification.")
    }
}

pub fn ensure_required_tools(runner: &dyn CommandRunner) -> anyhow::Result<()> {
    for tool in REQUIRED_TOOLS {
        runner
            .run(tool, &["--version"], None)
            .with_context(|| format!("checking that {tool} is installed"))?;
    }
    Ok(())
}
