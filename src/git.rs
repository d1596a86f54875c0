use std::path::{Path, PathBuf};

use tracing::info;

use crate::{command::CommandRunner, error::ReleaseError};

pub fn tag_name(version: &str) -> String {
    format!("v{version}")
}

pub fn commit_message(version: &str) -> String {
    format!("bump version to {version}")
}

/// The git operations of a release, run from the repository root.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    root: PathBuf,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, root: &Path) -> Self {
        Self {
            runner,
            root: root.to_path_buf(),
        }
    }

    fn git(&self, args: &[&str]) -> anyhow::Result<String> {
        self.runner.run("git", args, Some(&self.root))
    }

    pub fn is_clean(&self) -> anyhow::Result<bool> {
        Ok(self.git(&["status", "--porcelain"])?.is_empty())
    }

    /// Stages exactly `paths` and commits them.
    pub fn commit_release(&self, paths: &[&Path], version: &str) -> anyhow::Result<()> {
        let paths = paths
            .iter()
            .map(|path| path.to_string_lossy())
            .collect::<Vec<_>>();
        let mut add = vec!["add"];
        add.extend(paths.iter().map(|path| &**path));
        self.git(&add)?;

        let message = commit_message(version);
        self.git(&["commit", "-m", &message])?;
        info!(%message, "created release commit");
        Ok(())
    }

    pub fn current_branch(&self) -> anyhow::Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn push_branch(&self) -> anyhow::Result<String> {
        let branch = self.current_branch()?;
        self.git(&["push", "origin", &branch])?;
        Ok(branch)
    }

    pub fn tag_exists(&self, tag: &str) -> anyhow::Result<bool> {
        Ok(!self.git(&["tag", "-l", tag])?.trim().is_empty())
    }

    /// Refuses to move a tag that is already there.
    pub fn create_and_push_tag(&self, version: &str) -> anyhow::Result<String> {
        let tag = tag_name(version);
        if self.tag_exists(&tag)? {
            return Err(ReleaseError::TagExists(tag).into());
        }

        self.git(&["tag", &tag])?;
        self.git(&["push", "origin", &tag])?;
        info!(%tag, "pushed tag");
        Ok(tag)
    }
}
