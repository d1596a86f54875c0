#![allow(dead_code)]

use std::{
    cell::RefCell,
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use amberize_release::{
    command::{format_command, CommandRunner},
    config::ProjectLayout,
    error::ReleaseError,
    prompt::Console,
};
use serde_json::Value;
use tempfile::TempDir;

pub const CARGO_TOML: &str = "\
# desktop shell
[package]
name = \"amberize\"
version = \"VERSION\"
description = \"Amberize desktop\"
edition = \"2021\"

[build-dependencies]
tauri-build = { version = \"2\", features = [] }

[dependencies]
tauri = { version = \"2\", features = [] }
";

/// A desktop project tree in a temp dir.
pub struct Project {
    pub dir: TempDir,
    pub layout: ProjectLayout,
}

impl Project {
    pub fn new(tauri: &str, cargo: &str, package: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(layout.tauri_conf.parent().unwrap()).unwrap();

        fs::write(
            &layout.tauri_conf,
            format!(
                "{{\n  \"productName\": \"Amberize\",\n  \"version\": \"{tauri}\",\n  \"identifier\": \"app.amberize\",\n  \"plugins\": {{\n    \"updater\": {{\n      \"endpoints\": [\n        \"https://github.com/johannesmutter/amberize/releases/latest/download/latest.json\"\n      ]\n    }}\n  }}\n}}\n"
            ),
        )
        .unwrap();
        fs::write(&layout.cargo_toml, CARGO_TOML.replace("VERSION", cargo)).unwrap();
        fs::write(
            &layout.package_json,
            format!("{{\n  \"name\": \"amberize-desktop\",\n  \"private\": true,\n  \"version\": \"{package}\"\n}}\n"),
        )
        .unwrap();

        Self { dir, layout }
    }

    pub fn synchronized(version: &str) -> Self {
        Self::new(version, version, version)
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    pub fn snapshot(&self) -> [String; 3] {
        [
            self.read(&self.layout.tauri_conf),
            self.read(&self.layout.cargo_toml),
            self.read(&self.layout.package_json),
        ]
    }
}

/// Records every command and fakes what `git` and `npm` would do.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: RefCell<Vec<String>>,
    pub dirty: bool,
    pub existing_tags: Vec<String>,
    pub missing_tools: Vec<String>,
    /// `npm version` fails instead of writing `package.json`.
    pub npm_fails: bool,
}

impl FakeRunner {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn git_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("git ") && !call.ends_with("--version"))
            .collect()
    }

    fn npm_version(&self, args: &[&str]) -> anyhow::Result<String> {
        let prefix = PathBuf::from(args[1]);
        let version = args[3];
        let path = prefix.join("package.json");

        let mut package: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        package["version"] = Value::String(version.to_string());
        let mut text = serde_json::to_string_pretty(&package)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(format!("v{version}"))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str], _cwd: Option<&Path>) -> anyhow::Result<String> {
        let command = format_command(program, args);
        self.calls.borrow_mut().push(command.clone());

        if self.missing_tools.iter().any(|tool| tool == program) {
            return Err(ReleaseError::ToolMissing(program.to_string()).into());
        }

        match (program, args) {
            (_, ["--version"]) => Ok("1.0.0".to_string()),
            ("git", ["status", "--porcelain"]) if self.dirty => Ok(" M README.md".to_string()),
            ("git", ["rev-parse", "--abbrev-ref", "HEAD"]) => Ok("main".to_string()),
            ("git", ["tag", "-l", tag]) => Ok(self
                .existing_tags
                .iter()
                .find(|existing| existing.as_str() == *tag)
                .cloned()
                .unwrap_or_default()),
            ("npm", ["--prefix", _, "version", ..]) if self.npm_fails => {
                Err(ReleaseError::CommandFailed {
                    command,
                    message: "npm ERR! Invalid version".to_string(),
                }
                .into())
            }
            ("npm", ["--prefix", _, "version", ..]) => self.npm_version(args),
            _ => Ok(String::new()),
        }
    }
}

pub fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
    Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}
