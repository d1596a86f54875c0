use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::debug;

use crate::command::CommandRunner;

/// A release's asset. Does not contain all fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub download_count: u64,
}

/// A github release. Does not contain all fields.
///
/// See the github [docs](https://docs.github.com/en/rest/releases/releases?apiVersion=2022-11-28#list-releases) for more information
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default = "unknown_tag")]
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

fn unknown_tag() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoVisibility {
    #[serde(default = "unknown_tag")]
    pub visibility: String,
    #[serde(rename = "isPrivate", default)]
    pub is_private: bool,
}

/// Queries the hosting provider through the `gh` cli.
pub struct GhCli<'a> {
    runner: &'a dyn CommandRunner,
    repo: String,
    cwd: PathBuf,
}

impl<'a> GhCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, repo: impl Into<String>, cwd: &Path) -> Self {
        Self {
            runner,
            repo: repo.into(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn gh(&self, args: &[&str]) -> anyhow::Result<String> {
        self.runner.run("gh", args, Some(&self.cwd))
    }

    /// Every release, in the order the api returns them.
    pub fn releases(&self) -> anyhow::Result<Vec<Release>> {
        let endpoint = format!("repos/{}/releases", self.repo);
        let raw = self.gh(&["api", &endpoint, "--paginate", "--jq", "."])?;
        parse_release_pages(&raw).with_context(|| format!("reading releases of {}", self.repo))
    }

    /// File names of the assets attached to the latest release.
    pub fn latest_release_asset_names(&self) -> anyhow::Result<Vec<String>> {
        let endpoint = format!("repos/{}/releases/latest", self.repo);
        let raw = self.gh(&["api", &endpoint, "--jq", ".assets[].name"])?;

        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    pub fn repo_visibility(&self) -> anyhow::Result<RepoVisibility> {
        let raw = self.gh(&["repo", "view", &self.repo, "--json", "visibility,isPrivate"])?;
        serde_json::from_str(&raw).context("parsing `gh repo view` output")
    }
}

/// `--paginate` prints one json array per page, back to back.
pub fn parse_release_pages(raw: &str) -> anyhow::Result<Vec<Release>> {
    if !raw.trim_start().starts_with('[') {
        return Err(anyhow!("expected a json array of releases, got {:?}", preview(raw)));
    }

    let mut releases = Vec::new();
    for (page, chunk) in serde_json::Deserializer::from_str(raw)
        .into_iter::<Vec<Release>>()
        .enumerate()
    {
        let chunk = chunk.with_context(|| format!("malformed release page {}", page + 1))?;
        debug!(page = page + 1, releases = chunk.len(), "parsed release page");
        releases.extend(chunk);
    }

    Ok(releases)
}

fn preview(raw: &str) -> String {
    raw.trim().chars().take(60).collect()
}
