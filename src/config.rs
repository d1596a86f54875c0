use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args;

pub const DEFAULT_REPO: &str = "johannesmutter/amberize";
pub const ROOT_ENV_VAR: &str = "AMBERIZE_ROOT";
pub const REPO_ENV_VAR: &str = "AMBERIZE_REPO";
pub const TIMEOUT_ENV_VAR: &str = "AMBERIZE_HTTP_TIMEOUT";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Flags shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Repository root all project paths are resolved against.
    #[arg(long, env = ROOT_ENV_VAR, default_value = ".")]
    pub root: PathBuf,

    /// Hosting-provider repository, as `owner/name`.
    #[arg(long, env = REPO_ENV_VAR, default_value = DEFAULT_REPO)]
    pub repo: String,
}

impl CommonArgs {
    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.root)
    }
}

/// Where the release metadata lives inside the repository.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub desktop_dir: PathBuf,
    pub tauri_conf: PathBuf,
    pub cargo_toml: PathBuf,
    pub package_json: PathBuf,
    pub package_lock: PathBuf,
    pub download_stats: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let desktop_dir = root.join("apps").join("desktop");
        let tauri_dir = desktop_dir.join("src-tauri");

        Self {
            tauri_conf: tauri_dir.join("tauri.conf.json"),
            cargo_toml: tauri_dir.join("Cargo.toml"),
            package_json: desktop_dir.join("package.json"),
            package_lock: desktop_dir.join("package-lock.json"),
            download_stats: root
                .join("apps")
                .join("landing")
                .join("src")
                .join("lib")
                .join("download-stats.json"),
            desktop_dir,
            root,
        }
    }

    /// `path` relative to the root, for git arguments and messages.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

pub fn parse_timeout(value: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(value)
}
