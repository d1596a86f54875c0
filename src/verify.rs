//! Post-release checks of the auto-update channel.

use std::{fmt, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    error::ReleaseError,
    github::GhCli,
    sources::{read_json, JsonVersionFile, VersionSource},
};

pub const USER_AGENT: &str = "amberize-release-verify/1.0";
pub const MANIFEST_ASSET: &str = "latest.json";
pub const UPDATER_ARCHIVE_SUFFIX: &str = ".app.tar.gz";
pub const UPDATER_SIGNATURE_SUFFIX: &str = ".app.tar.gz.sig";

/// Every run reports this many checks; fewer means one was skipped.
pub const CHECK_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub title: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(title: &'static str, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            title,
            ok,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.ok { "PASS" } else { "FAIL" };
        write!(f, "[{marker}] {}: {}", self.title, self.detail)
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub checks: Vec<CheckResult>,
}

impl Report {
    pub fn push(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    pub fn all_passed(&self) -> bool {
        self.checks.len() == CHECK_COUNT && self.checks.iter().all(|check| check.ok)
    }
}

#[derive(Debug, Default, Deserialize)]
struct TauriConf {
    #[serde(default)]
    plugins: Plugins,
}

#[derive(Debug, Default, Deserialize)]
struct Plugins {
    #[serde(default)]
    updater: Updater,
}

#[derive(Debug, Default, Deserialize)]
struct Updater {
    #[serde(default)]
    endpoints: Vec<String>,
}

/// First entry of `plugins.updater.endpoints`.
pub fn configured_endpoint(tauri_conf: &Path) -> anyhow::Result<String> {
    let conf: TauriConf = serde_json::from_value(read_json(tauri_conf)?)
        .with_context(|| format!("reading updater settings from {}", tauri_conf.display()))?;

    conf.plugins
        .updater
        .endpoints
        .into_iter()
        .next()
        .ok_or_else(|| ReleaseError::MissingEndpoint(tauri_conf.to_path_buf()).into())
}

pub fn check_repo_visibility(gh: &GhCli) -> CheckResult {
    const TITLE: &str = "Repository visibility";

    match gh.repo_visibility() {
        Ok(vis) if vis.is_private => {
            CheckResult::new(TITLE, false, format!("repository is private ({})", vis.visibility))
        }
        Ok(vis) => CheckResult::new(
            TITLE,
            true,
            format!("repository visibility is {}", vis.visibility.to_lowercase()),
        ),
        Err(err) => CheckResult::new(
            TITLE,
            false,
            format!("Could not inspect repo visibility ({err:#})"),
        ),
    }
}

/// The latest release must carry the update manifest plus the macOS updater
/// archive and its detached signature.
pub fn evaluate_release_assets(names: &[String]) -> CheckResult {
    const TITLE: &str = "Latest release assets";

    if !names.iter().any(|name| name == MANIFEST_ASSET) {
        return CheckResult::new(
            TITLE,
            false,
            format!("latest release does not contain {MANIFEST_ASSET} asset"),
        );
    }

    let has_archive = names
        .iter()
        .any(|name| name.ends_with(UPDATER_ARCHIVE_SUFFIX));
    let has_signature = names
        .iter()
        .any(|name| name.ends_with(UPDATER_SIGNATURE_SUFFIX));
    if !has_archive || !has_signature {
        return CheckResult::new(TITLE, false, "missing macOS updater tarball/signature assets");
    }

    CheckResult::new(
        TITLE,
        true,
        format!(
            "{} assets present including updater artifacts",
            names.len()
        ),
    )
}

pub fn check_release_assets(gh: &GhCli) -> CheckResult {
    match gh.latest_release_asset_names() {
        Ok(names) => evaluate_release_assets(&names),
        Err(err) => CheckResult::new(
            "Latest release assets",
            false,
            format!("Could not read latest release assets ({err:#})"),
        ),
    }
}

/// What the installed app sees when it polls the update channel.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateManifest {
    pub version: String,
    pub platforms: Map<String, Value>,
}

impl UpdateManifest {
    /// `None` when `platforms` is missing, not an object, or empty.
    pub fn from_json(payload: &Value) -> Option<Self> {
        let platforms = payload
            .get("platforms")?
            .as_object()
            .filter(|platforms| !platforms.is_empty())?
            .clone();
        let version = match payload.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(other) => other.to_string(),
            None => "missing".to_string(),
        };

        Some(Self { version, platforms })
    }
}

pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

pub async fn fetch_json(client: &Client, url: &str) -> anyhow::Result<Value> {
    debug!(url, "fetching update manifest");
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|err| anyhow!("Could not reach {url}: {err}"))?;

    match resp.status() {
        status if status.is_success() => resp
            .json()
            .await
            .map_err(|err| anyhow!("Invalid JSON from {url}: {err}")),
        status => Err(anyhow!("HTTP {} for {url}", status.as_u16())),
    }
}

pub async fn check_endpoint(client: &Client, url: &str) -> (CheckResult, Option<UpdateManifest>) {
    const TITLE: &str = "Updater endpoint fetch";

    let payload = match fetch_json(client, url).await {
        Ok(payload) => payload,
        Err(err) => return (CheckResult::new(TITLE, false, format!("{err:#}")), None),
    };

    match UpdateManifest::from_json(&payload) {
        Some(manifest) => (
            CheckResult::new(
                TITLE,
                true,
                format!(
                    "version={}, platforms={}",
                    manifest.version,
                    manifest.platforms.len()
                ),
            ),
            Some(manifest),
        ),
        None => (
            CheckResult::new(TITLE, false, "JSON has no platforms section"),
            None,
        ),
    }
}

pub const ALIGNMENT_TITLE: &str = "Endpoint version alignment";

/// Exact string comparison; `1.2.3` and `1.2.3-beta` do not match.
pub fn check_version_alignment(remote: &str, local: &str) -> CheckResult {
    CheckResult::new(
        ALIGNMENT_TITLE,
        remote == local,
        format!("endpoint={remote}, local_config={local}"),
    )
}

/// The local side is read fresh from the app configuration.
pub fn check_version_alignment_with(manifest: &UpdateManifest, tauri_conf: &Path) -> CheckResult {
    match JsonVersionFile::new("tauri.conf.json", tauri_conf).read() {
        Ok(local) => check_version_alignment(&manifest.version, &local),
        Err(err) => CheckResult::new(
            ALIGNMENT_TITLE,
            false,
            format!("could not compare versions ({err:#})"),
        ),
    }
}

pub fn skipped_alignment() -> CheckResult {
    CheckResult::new(
        ALIGNMENT_TITLE,
        false,
        "skipped, updater endpoint fetch failed",
    )
}

/// Runs the four checks in order. `on_check` sees each result as soon as it
/// is known; a failed fetch records the alignment check as skipped.
pub async fn run_checks(
    gh: &GhCli<'_>,
    client: &Client,
    endpoint: &str,
    tauri_conf: &Path,
    mut on_check: impl FnMut(&CheckResult),
) -> Report {
    let mut report = Report::default();
    let mut record = |check: CheckResult| {
        on_check(&check);
        report.push(check);
    };

    record(check_repo_visibility(gh));
    record(check_release_assets(gh));

    let (fetched, manifest) = check_endpoint(client, endpoint).await;
    record(fetched);
    record(match manifest {
        Some(manifest) => check_version_alignment_with(&manifest, tauri_conf),
        None => skipped_alignment(),
    });

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn healthy_release_assets_pass() {
        let check = evaluate_release_assets(&names(&[
            "latest.json",
            "Amberize_aarch64.app.tar.gz",
            "Amberize_aarch64.app.tar.gz.sig",
            "Amberize_1.0.0_aarch64.dmg",
        ]));
        assert!(check.ok);
        assert_eq!(check.detail, "4 assets present including updater artifacts");
    }

    #[test]
    fn missing_signature_fails_even_with_archive() {
        let check =
            evaluate_release_assets(&names(&["latest.json", "Amberize_aarch64.app.tar.gz"]));
        assert!(!check.ok);
        assert_eq!(check.detail, "missing macOS updater tarball/signature assets");
    }

    #[test]
    fn manifest_asset_must_match_exactly() {
        let check = evaluate_release_assets(&names(&[
            "old-latest.json",
            "a.app.tar.gz",
            "a.app.tar.gz.sig",
        ]));
        assert!(!check.ok);
        assert!(check.detail.contains("latest.json"));
    }

    #[test]
    fn alignment_is_exact() {
        assert!(check_version_alignment("1.2.3", "1.2.3").ok);
        assert!(!check_version_alignment("1.2.3-beta", "1.2.3").ok);
        assert!(!check_version_alignment("v1.2.3", "1.2.3").ok);
    }

    #[test]
    fn manifest_needs_non_empty_platforms_object() {
        let ok = serde_json::json!({
            "version": "1.0.0",
            "platforms": {"darwin-aarch64": {"url": "u", "signature": "s"}}
        });
        let manifest = UpdateManifest::from_json(&ok).unwrap();
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.platforms.len(), 1);

        for bad in [
            serde_json::json!({"version": "1.0.0"}),
            serde_json::json!({"version": "1.0.0", "platforms": {}}),
            serde_json::json!({"version": "1.0.0", "platforms": ["darwin"]}),
        ] {
            assert!(UpdateManifest::from_json(&bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn report_requires_every_check() {
        let mut report = Report::default();
        for title in ["a", "b", "c"] {
            report.push(CheckResult::new(title, true, ""));
        }
        assert!(!report.all_passed());

        report.push(CheckResult::new("d", true, ""));
        assert!(report.all_passed());

        report.checks[3].ok = false;
        assert!(!report.all_passed());
    }

    #[test]
    fn check_line_format() {
        let line = CheckResult::new("Repository visibility", false, "repository is private (PRIVATE)");
        assert_eq!(
            line.to_string(),
            "[FAIL] Repository visibility: repository is private (PRIVATE)"
        );
    }

    #[test]
    fn endpoint_comes_from_first_configured_entry() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("tauri.conf.json");
        std::fs::write(
            &path,
            r#"{"version": "1.0.0", "plugins": {"updater": {"endpoints": ["https://a/latest.json", "https://b"]}}}"#,
        )
        .unwrap();
        assert_eq!(configured_endpoint(&path).unwrap(), "https://a/latest.json");

        std::fs::write(&path, r#"{"version": "1.0.0", "plugins": {}}"#).unwrap();
        let err = configured_endpoint(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::MissingEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn endpoint_fetch_sends_identifying_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/latest.json")
            .match_header("user-agent", USER_AGENT)
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version": "1.2.0", "platforms": {"darwin-aarch64": {}, "windows-x86_64": {}}}"#)
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let (check, manifest) = check_endpoint(&client, &format!("{}/latest.json", server.url())).await;

        mock.assert_async().await;
        assert!(check.ok, "{check}");
        assert_eq!(check.detail, "version=1.2.0, platforms=2");
        assert_eq!(manifest.unwrap().version, "1.2.0");
    }

    #[tokio::test]
    async fn endpoint_without_platforms_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest.json")
            .with_status(200)
            .with_body(r#"{"version": "1.2.0"}"#)
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let (check, manifest) = check_endpoint(&client, &format!("{}/latest.json", server.url())).await;

        assert!(!check.ok);
        assert_eq!(check.detail, "JSON has no platforms section");
        assert!(manifest.is_none());
    }

    #[tokio::test]
    async fn http_errors_fail_the_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest.json")
            .with_status(500)
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/latest.json", server.url());
        let (check, _) = check_endpoint(&client, &url).await;

        assert!(!check.ok);
        assert_eq!(check.detail, format!("HTTP 500 for {url}"));
    }

    #[tokio::test]
    async fn missing_manifest_reports_plain_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest.json")
            .with_status(404)
            .create_async()
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/latest.json", server.url());
        let (check, _) = check_endpoint(&client, &url).await;

        assert!(!check.ok);
        assert_eq!(check.detail, format!("HTTP 404 for {url}"));
    }

    fn manifest(version: &str) -> UpdateManifest {
        UpdateManifest::from_json(&serde_json::json!({
            "version": version,
            "platforms": {"darwin-aarch64": {}}
        }))
        .unwrap()
    }

    #[test]
    fn alignment_reads_local_config_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("tauri.conf.json");
        std::fs::write(&path, r#"{"version": "1.2.3"}"#).unwrap();

        let check = check_version_alignment_with(&manifest("1.2.3"), &path);
        assert!(check.ok, "{check}");
        assert_eq!(check.detail, "endpoint=1.2.3, local_config=1.2.3");

        let check = check_version_alignment_with(&manifest("1.2.3-beta"), &path);
        assert!(!check.ok);
        assert_eq!(check.detail, "endpoint=1.2.3-beta, local_config=1.2.3");

        std::fs::write(&path, r#"{"version": "1.3.0"}"#).unwrap();
        assert!(!check_version_alignment_with(&manifest("1.2.3"), &path).ok);
    }

    #[test]
    fn unreadable_local_config_fails_alignment() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("tauri.conf.json");

        let check = check_version_alignment_with(&manifest("1.2.3"), &path);
        assert!(!check.ok);
        assert!(check.detail.starts_with("could not compare versions"), "{check}");

        std::fs::write(&path, r#"{"productName": "Amberize"}"#).unwrap();
        assert!(!check_version_alignment_with(&manifest("1.2.3"), &path).ok);
    }
}
