use std::{fs, path::Path};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::github::{GhCli, Release};

/// Only count installer files that real users download.
pub const INSTALLER_EXTENSIONS: [&str; 5] = [".dmg", ".msi", ".deb", ".AppImage", ".exe"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDownloads {
    pub tag: String,
    pub downloads: u64,
}

/// The document the landing page reads at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub total_downloads: u64,
    pub latest_version: String,
    pub releases: Vec<ReleaseDownloads>,
}

pub fn is_installer(asset_name: &str) -> bool {
    INSTALLER_EXTENSIONS
        .iter()
        .any(|ext| asset_name.ends_with(ext))
}

/// Sums installer downloads per release, keeping api order.
pub fn summarize(releases: &[Release]) -> DownloadSummary {
    let mut latest_version = None;
    let mut total_downloads = 0;
    let mut per_release = Vec::with_capacity(releases.len());

    for release in releases {
        if latest_version.is_none() && !release.draft && !release.prerelease {
            // skip v (in 'v0.0.1')
            let tag = &release.tag_name;
            latest_version = Some(tag.strip_prefix('v').unwrap_or(tag).to_string());
        }

        let downloads = release
            .assets
            .iter()
            .filter(|asset| is_installer(&asset.name))
            .map(|asset| asset.download_count)
            .sum();

        total_downloads += downloads;
        per_release.push(ReleaseDownloads {
            tag: release.tag_name.clone(),
            downloads,
        });
    }

    DownloadSummary {
        total_downloads,
        latest_version: latest_version.unwrap_or_default(),
        releases: per_release,
    }
}

pub fn fetch_release_stats(gh: &GhCli) -> anyhow::Result<DownloadSummary> {
    let releases = gh.releases()?;
    info!(count = releases.len(), repo = gh.repo(), "fetched releases");
    Ok(summarize(&releases))
}

/// Replaces whatever is at `path`.
pub fn write_summary(path: &Path, summary: &DownloadSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut json = serde_json::to_string_pretty(summary)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
