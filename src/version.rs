use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use semver::Version;

use crate::error::ReleaseError;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is valid"));

pub fn is_strict_semver(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// Parses plain `MAJOR.MINOR.PATCH`. Pre-release and build suffixes, a leading
/// `v` and missing components are all rejected.
pub fn parse_semver(version: &str) -> Result<Version, ReleaseError> {
    let invalid = || ReleaseError::InvalidVersion(version.to_string());
    if !is_strict_semver(version) {
        return Err(invalid());
    }

    let mut parts = version.split('.').map(str::parse::<u64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch))) => {
            Ok(Version::new(major, minor, patch))
        }
        // components too large for u64
        _ => Err(invalid()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl Bump {
    pub fn apply(self, version: &Version) -> Version {
        match self {
            Bump::Patch => Version::new(version.major, version.minor, version.patch + 1),
            Bump::Minor => Version::new(version.major, version.minor + 1, 0),
            Bump::Major => Version::new(version.major + 1, 0, 0),
        }
    }
}

impl FromStr for Bump {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patch" => Ok(Bump::Patch),
            "minor" => Ok(Bump::Minor),
            "major" => Ok(Bump::Major),
            other => Err(format!("Unsupported increment mode: {other}")),
        }
    }
}

pub fn increment_version(version: &str, bump: Bump) -> Result<String, ReleaseError> {
    Ok(bump.apply(&parse_semver(version)?).to_string())
}

/// How the release version is picked: a bump of the current one, an explicit
/// value, or the current one unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetChoice {
    Bump(Bump),
    Custom(Version),
    Keep,
}

impl TargetChoice {
    pub fn resolve(&self, base: &str) -> Result<String, ReleaseError> {
        match self {
            TargetChoice::Bump(bump) => increment_version(base, *bump),
            TargetChoice::Custom(version) => Ok(version.to_string()),
            TargetChoice::Keep => Ok(base.to_string()),
        }
    }
}

impl FromStr for TargetChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "keep" {
            return Ok(TargetChoice::Keep);
        }
        if let Ok(bump) = s.parse() {
            return Ok(TargetChoice::Bump(bump));
        }
        parse_semver(s)
            .map(TargetChoice::Custom)
            .map_err(|_| format!("expected patch, minor, major, keep or X.Y.Z, got {s:?}"))
    }
}
