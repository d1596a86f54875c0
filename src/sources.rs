//! The three places the desktop app records its version, behind one interface.
//!
//! - `tauri.conf.json`: top-level `version` field, rewritten in place.
//! - `src-tauri/Cargo.toml`: `version` line of the `[package]` table, patched
//!   as text so comments and formatting survive.
//! - `package.json`: read directly, written through `npm version` so the
//!   lockfile follows.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{anyhow, Context};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    command::CommandRunner, config::ProjectLayout, error::ReleaseError, version::is_strict_semver,
};

pub trait VersionSource {
    /// Short label shown to the operator.
    fn label(&self) -> &str;
    fn path(&self) -> &Path;
    fn read(&self) -> anyhow::Result<String>;
    fn write(&self, version: &str) -> anyhow::Result<()>;
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_json(path: &Path, content: &Value) -> anyhow::Result<()> {
    let mut text = serde_json::to_string_pretty(content)?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn version_field(document: &Value, path: &Path) -> anyhow::Result<String> {
    match document.get("version") {
        Some(Value::String(version)) => Ok(version.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(anyhow!("{} has no top-level \"version\"", path.display())),
    }
}

/// A json document with a top-level `version` field.
pub struct JsonVersionFile {
    label: String,
    path: PathBuf,
}

impl JsonVersionFile {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

impl VersionSource for JsonVersionFile {
    fn label(&self) -> &str {
        &self.label
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<String> {
        version_field(&read_json(&self.path)?, &self.path)
    }

    fn write(&self, version: &str) -> anyhow::Result<()> {
        let mut document = read_json(&self.path)?;
        let fields = document
            .as_object_mut()
            .ok_or_else(|| anyhow!("{} is not a json object", self.path.display()))?;
        fields.insert("version".to_string(), Value::String(version.to_string()));
        write_json(&self.path, &document)
    }
}

static PACKAGE_VERSION_READ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^version\s*=\s*"([^"]+)""#).expect("version read pattern is valid")
});
static PACKAGE_VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*version\s*=\s*"[^"]+"\s*$"#).expect("version line pattern is valid")
});
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]+""#).expect("quoted pattern is valid"));

fn section_header(line: &str) -> Option<&str> {
    let line = line.trim();
    (line.starts_with('[') && line.ends_with(']')).then_some(line)
}

pub fn read_package_version(manifest: &str) -> Option<String> {
    let mut in_package = false;
    for line in manifest.lines() {
        if let Some(header) = section_header(line) {
            in_package = header == "[package]";
            continue;
        }
        if in_package {
            if let Some(caps) = PACKAGE_VERSION_READ.captures(line.trim()) {
                return Some(caps[1].to_string());
            }
        }
    }
    None
}

/// Rewrites the first `version = "..."` line of `[package]`. Every other byte,
/// line endings included, is kept.
pub fn replace_package_version(manifest: &str, version: &str) -> Option<String> {
    let mut in_package = false;
    let mut out = String::with_capacity(manifest.len() + version.len());
    let mut replaced = false;

    for line in manifest.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        if !replaced {
            if let Some(header) = section_header(body) {
                in_package = header == "[package]";
            } else if in_package && PACKAGE_VERSION_LINE.is_match(body) {
                let quoted = format!("\"{version}\"");
                out.push_str(&QUOTED.replace(body, regex::NoExpand(&quoted)));
                out.push_str(ending);
                replaced = true;
                continue;
            }
        }
        out.push_str(line);
    }

    replaced.then_some(out)
}

fn split_line_ending(line: &str) -> (&str, &str) {
    let body = line.trim_end_matches(['\n', '\r']);
    (body, &line[body.len()..])
}

/// `Cargo.toml` of the desktop crate.
pub struct CargoManifest {
    path: PathBuf,
}

impl CargoManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn contents(&self) -> anyhow::Result<String> {
        fs::read_to_string(&self.path).with_context(|| format!("reading {}", self.path.display()))
    }
}

impl VersionSource for CargoManifest {
    fn label(&self) -> &str {
        "src-tauri/Cargo.toml"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<String> {
        read_package_version(&self.contents()?)
            .ok_or_else(|| ReleaseError::MissingPackageVersion(self.path.clone()).into())
    }

    fn write(&self, version: &str) -> anyhow::Result<()> {
        let updated = replace_package_version(&self.contents()?, version)
            .ok_or_else(|| ReleaseError::MissingPackageVersion(self.path.clone()))?;
        fs::write(&self.path, updated).with_context(|| format!("writing {}", self.path.display()))
    }
}

/// `package.json`, written with the package manager's own version command.
pub struct NpmPackage<'a> {
    runner: &'a dyn CommandRunner,
    dir: PathBuf,
    path: PathBuf,
}

impl<'a> NpmPackage<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            runner,
            path: dir.join("package.json"),
            dir,
        }
    }
}

impl VersionSource for NpmPackage<'_> {
    fn label(&self) -> &str {
        "package.json"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<String> {
        version_field(&read_json(&self.path)?, &self.path)
    }

    fn write(&self, version: &str) -> anyhow::Result<()> {
        let prefix = self.dir.to_string_lossy();
        self.runner.run(
            "npm",
            &[
                "--prefix",
                &prefix,
                "version",
                version,
                "--no-git-tag-version",
                "--allow-same-version",
            ],
            None,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReading {
    pub label: String,
    pub version: String,
}

/// One reading of every version source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionState {
    pub readings: Vec<VersionReading>,
    canonical: usize,
}

impl VersionState {
    pub fn is_synchronized(&self) -> bool {
        self.readings
            .windows(2)
            .all(|pair| pair[0].version == pair[1].version)
    }

    /// The version the release is based on when the sources disagree.
    pub fn canonical(&self) -> &str {
        &self.readings[self.canonical].version
    }

    pub fn canonical_label(&self) -> &str {
        &self.readings[self.canonical].label
    }
}

/// The desktop app's version sources. The project manifest is canonical.
pub struct VersionSet<'a> {
    sources: Vec<Box<dyn VersionSource + 'a>>,
    canonical: usize,
}

impl<'a> VersionSet<'a> {
    pub(crate) fn new(sources: Vec<Box<dyn VersionSource + 'a>>, canonical: usize) -> Self {
        debug_assert!(canonical < sources.len(), "canonical source out of range");
        Self { sources, canonical }
    }

    pub fn desktop(layout: &ProjectLayout, runner: &'a dyn CommandRunner) -> Self {
        let sources: Vec<Box<dyn VersionSource + 'a>> = vec![
            Box::new(JsonVersionFile::new("tauri.conf.json", &layout.tauri_conf)),
            Box::new(CargoManifest::new(&layout.cargo_toml)),
            Box::new(NpmPackage::new(runner, &layout.desktop_dir)),
        ];
        Self::new(sources, 1)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|source| source.path())
    }

    pub fn read_state(&self) -> anyhow::Result<VersionState> {
        let readings = self
            .sources
            .iter()
            .map(|source| {
                Ok(VersionReading {
                    label: source.label().to_string(),
                    version: source.read()?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(VersionState {
            readings,
            canonical: self.canonical,
        })
    }

    /// Writes `target` to every source, stopping at the first failure. Files
    /// already written stay written.
    pub fn update_versions(&self, target: &str) -> anyhow::Result<()> {
        if !is_strict_semver(target) {
            return Err(ReleaseError::InvalidVersion(target.to_string()).into());
        }

        let mut written = Vec::new();
        for source in &self.sources {
            debug!(source = source.label(), version = target, "writing version");
            source.write(target).with_context(|| {
                if written.is_empty() {
                    format!("updating {}", source.label())
                } else {
                    format!(
                        "updating {} (already written: {})",
                        source.label(),
                        written.join(", ")
                    )
                }
            })?;
            written.push(source.label());
        }

        info!(version = target, "updated all version sources");
        Ok(())
    }

    /// Writes `target`, reads everything back, and fails unless every source
    /// now agrees on `target`.
    pub fn apply(&self, target: &str) -> anyhow::Result<VersionState> {
        self.update_versions(target)?;
        let state = self.read_state()?;

        if !state.is_synchronized() {
            return Err(ReleaseError::Consistency("sources disagree after update".into()).into());
        }
        if state.canonical() != target {
            return Err(ReleaseError::Consistency(format!(
                "expected {target}, found {}",
                state.canonical()
            ))
            .into());
        }

        Ok(state)
    }
}
