// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::CommandTemplates;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// include = ["packages/child"]
///
/// [package]
/// name = "nrser"
///
/// [config]
/// debounce_ms = 300
///
/// [[babel]]
/// id = "src"
/// src = "src"
/// dest = "lib"
/// clean = true
/// watch = true
///
/// [[mocha]]
/// id = "unit"
/// tests = "test/**/*.test.js"
/// watch = true
/// ```
///
/// Everything except `[package].name` is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub package: PackageSection,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub commands: CommandTemplates,

    #[serde(default)]
    pub clean: Vec<CleanConfig>,

    #[serde(default)]
    pub babel: Vec<BuildConfig>,

    #[serde(default)]
    pub less: Vec<BuildConfig>,

    #[serde(default)]
    pub mocha: Vec<MochaConfig>,

    #[serde(default)]
    pub watch_files: Vec<WatchFilesConfig>,

    /// Child package directories (or config files), relative to this file.
    #[serde(default)]
    pub include: Vec<PathBuf>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, so holding
/// one means the checks in `validate.rs` passed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    raw: RawConfigFile,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self { raw }
    }

    pub fn package(&self) -> &PackageSection {
        &self.raw.package
    }

    pub fn config(&self) -> &ConfigSection {
        &self.raw.config
    }

    pub fn commands(&self) -> &CommandTemplates {
        &self.raw.commands
    }

    pub fn clean(&self) -> &[CleanConfig] {
        &self.raw.clean
    }

    pub fn babel(&self) -> &[BuildConfig] {
        &self.raw.babel
    }

    pub fn less(&self) -> &[BuildConfig] {
        &self.raw.less
    }

    pub fn mocha(&self) -> &[MochaConfig] {
        &self.raw.mocha
    }

    pub fn watch_files(&self) -> &[WatchFilesConfig] {
        &self.raw.watch_files
    }

    pub fn include(&self) -> &[PathBuf] {
        &self.raw.include
    }
}

/// `[package]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSection {
    /// Package component of every task name. Required.
    #[serde(default)]
    pub name: String,

    /// Package root relative to the config file's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Debounce delay for watch-driven reruns, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Surface run-time failures through the notifier.
    #[serde(default = "default_notify")]
    pub notify: bool,

    /// Drop `changed` events whose content hash did not change.
    #[serde(default)]
    pub skip_unchanged: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_notify() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            notify: default_notify(),
            skip_unchanged: false,
        }
    }
}

impl ConfigSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// `[[clean]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanConfig {
    pub id: String,
    pub dest: PathBuf,
}

/// `[[babel]]` / `[[less]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    pub id: String,
    pub src: String,
    pub dest: PathBuf,
    #[serde(default)]
    pub clean: bool,
    #[serde(default)]
    pub watch: bool,
}

/// `[[mocha]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MochaConfig {
    pub id: String,
    pub tests: String,
    #[serde(default)]
    pub watch: bool,
    /// Replaces the default watched set (every build output).
    #[serde(default)]
    pub watch_patterns: Option<Vec<String>>,
}

/// `[[watch_files]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchFilesConfig {
    pub id: String,
    pub patterns: Vec<String>,
    /// Canonical name of the task to re-run, e.g. `"mocha:nrser:unit"`.
    pub run: String,
}
