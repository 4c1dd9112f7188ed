// src/orchestrator/options.rs

//! Argument structs for the declaration API.
//!
//! Paths are relative to the package root unless absolute. Source and test
//! paths may be globs (`src/**/*.js`) or plain directories, in which case
//! the tool's default suffix is appended.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    pub id: String,
    pub dest: PathBuf,
}

impl CleanOptions {
    pub fn new(id: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dest: dest.into(),
        }
    }
}

/// Options shared by every build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub id: String,
    pub src: String,
    pub dest: PathBuf,
    /// Attach a clean task that removes `dest` before each build.
    pub clean: bool,
    /// Declare the matching watch companion.
    pub watch: bool,
}

impl BuildOptions {
    pub fn new(id: impl Into<String>, src: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            dest: dest.into(),
            clean: false,
            watch: false,
        }
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

pub type BabelOptions = BuildOptions;
pub type LessOptions = BuildOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MochaOptions {
    pub id: String,
    pub tests: String,
    pub watch: bool,
    /// Overrides the default watched set (every build output).
    pub watch_patterns: Option<Vec<String>>,
}

impl MochaOptions {
    pub fn new(id: impl Into<String>, tests: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tests: tests.into(),
            watch: false,
            watch_patterns: None,
        }
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn watch_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

/// Watch companion for an already-declared task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// `None` keeps the default watched set for the target's kind.
    pub patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchFilesOptions {
    pub id: String,
    pub patterns: Vec<String>,
    /// Canonical name of the task re-run on any event.
    pub run: String,
}

impl WatchFilesOptions {
    pub fn new<I, S>(id: impl Into<String>, patterns: I, run: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            run: run.into(),
        }
    }
}
