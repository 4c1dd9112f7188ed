// src/task/build.rs

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::task::clean::CleanTask;
use crate::task::name::{TaskKind, TaskName};
use crate::watch::Pattern;

/// The source-to-output transform a build task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTool {
    Babel,
    Less,
}

impl BuildTool {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildTool::Babel => "babel",
            BuildTool::Less => "less",
        }
    }

    pub fn kind(self) -> TaskKind {
        match self {
            BuildTool::Babel => TaskKind::Babel,
            BuildTool::Less => TaskKind::Less,
        }
    }

    pub fn watch_kind(self) -> TaskKind {
        match self {
            BuildTool::Babel => TaskKind::WatchBabel,
            BuildTool::Less => TaskKind::WatchLess,
        }
    }

    /// Suffix used when the source is given as a plain directory.
    pub fn default_suffix(self) -> &'static str {
        match self {
            BuildTool::Babel => "**/*.js",
            BuildTool::Less => "**/*.less",
        }
    }

    /// Where the output for source file `rel` lands, relative to the
    /// destination directory.
    pub fn output_rel(self, rel: &str) -> PathBuf {
        let rel = Path::new(rel);
        match self {
            BuildTool::Babel => rel.to_path_buf(),
            BuildTool::Less => rel.with_extension("css"),
        }
    }
}

/// Compiles a source pattern into a destination directory, optionally
/// cleaning that directory first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub name: TaskName,
    pub tool: BuildTool,
    pub src: Pattern,
    pub dest: PathBuf,
    pub clean: Option<CleanTask>,
}

impl BuildTask {
    pub fn new(name: TaskName, tool: BuildTool, src: Pattern, dest: impl Into<PathBuf>) -> Self {
        Self {
            name,
            tool,
            src,
            dest: dest.into(),
            clean: None,
        }
    }

    /// Tasks that must complete before this one starts: the attached clean
    /// task, if there is one.
    pub fn dependencies(&self) -> Vec<&TaskName> {
        self.clean.iter().map(|c| &c.name).collect()
    }

    /// Everything this task writes.
    pub fn output_pattern(&self) -> Result<Pattern> {
        Pattern::new(&self.dest, "**/*")
    }

    pub async fn run(&self, exec: &dyn ExecutorBackend) -> Result<()> {
        exec.compile(self.tool, self.src.clone(), self.dest.clone()).await
    }
}
