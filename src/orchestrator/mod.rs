// src/orchestrator/mod.rs

//! Declaration API.
//!
//! An [`Orchestrator`] belongs to one package. Each declaration resolves its
//! paths against the package root, registers the task under its canonical
//! name (failing on duplicates), optionally attaches a clean dependency and
//! optionally declares a watch companion. [`Orchestrator::create_graph`]
//! then synthesizes the composite commands.

pub mod graph;
pub mod options;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, WatchgraphError};
use crate::fs::FileSystem;
use crate::task::{
    BuildTask, BuildTool, CleanTask, MochaTask, Task, TaskKind, TaskName, WatchAction, WatchTask,
};
use crate::watch::Pattern;

pub use graph::TaskGraph;
pub use options::{
    BabelOptions, BuildOptions, CleanOptions, LessOptions, MochaOptions, WatchFilesOptions,
    WatchOptions,
};

/// Suffix appended to a plain test directory.
pub const DEFAULT_TEST_SUFFIX: &str = "**/*.js";
/// Suffix appended to a plain directory given as a watch pattern.
pub const DEFAULT_WATCH_SUFFIX: &str = "**/*";

#[derive(Debug)]
pub struct Orchestrator {
    package_name: String,
    package_root: PathBuf,
    fs: Arc<dyn FileSystem>,
    skip_unchanged: bool,
    tasks: BTreeMap<TaskName, Task>,
}

impl Orchestrator {
    /// `package_root` must be absolute; every relative path in a
    /// declaration is resolved against it.
    pub fn new(
        package_name: impl Into<String>,
        package_root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let package_name = package_name.into();
        let package_root = package_root.into();
        if package_name.is_empty() {
            return Err(WatchgraphError::MissingField("package name".to_string()));
        }
        if !package_root.is_absolute() {
            return Err(WatchgraphError::ConfigError(format!(
                "package root must be absolute: {}",
                package_root.display()
            )));
        }
        Ok(Self {
            package_name,
            package_root,
            fs,
            skip_unchanged: false,
            tasks: BTreeMap::new(),
        })
    }

    /// Watch tasks declared after this call drop `changed` events whose
    /// content did not change.
    pub fn set_skip_unchanged(&mut self, skip: bool) {
        self.skip_unchanged = skip;
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn tasks(&self) -> &BTreeMap<TaskName, Task> {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn tasks_of_kind(&self, kind: TaskKind) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values().filter(move |t| t.kind() == kind)
    }

    pub fn build_tasks(&self) -> impl Iterator<Item = &BuildTask> + '_ {
        self.tasks.values().filter_map(Task::as_build)
    }

    pub fn watch_tasks(&self) -> impl Iterator<Item = &WatchTask> + '_ {
        self.tasks.values().filter_map(Task::as_watch)
    }

    pub fn clean(&mut self, opts: CleanOptions) -> Result<TaskName> {
        let name = self.name(TaskKind::Clean, &opts.id)?;
        let dest = self.resolve_path(&opts.dest);
        self.register(Task::Clean(CleanTask::new(name.clone(), dest)))?;
        Ok(name)
    }

    pub fn babel(&mut self, opts: BabelOptions) -> Result<TaskName> {
        self.build(BuildTool::Babel, opts)
    }

    pub fn less(&mut self, opts: LessOptions) -> Result<TaskName> {
        self.build(BuildTool::Less, opts)
    }

    fn build(&mut self, tool: BuildTool, opts: BuildOptions) -> Result<TaskName> {
        let name = self.name(tool.kind(), &opts.id)?;
        let src = self.resolve_pattern(&opts.src, tool.default_suffix())?;
        let dest = self.resolve_path(&opts.dest);
        self.register(Task::Build(BuildTask::new(name.clone(), tool, src, dest)))?;

        if opts.clean {
            self.attach_clean(&name)?;
        }
        if opts.watch {
            self.watch(&name, WatchOptions::default())?;
        }
        Ok(name)
    }

    /// Attach (and register) a clean task removing a build task's
    /// destination. Attaching twice returns the existing clean task.
    pub fn attach_clean(&mut self, build: &TaskName) -> Result<TaskName> {
        let (existing, dest) = match self.tasks.get(build.as_str()) {
            Some(Task::Build(task)) => (task.clean.as_ref().map(|c| c.name.clone()), task.dest.clone()),
            Some(_) => {
                return Err(WatchgraphError::ConfigError(format!(
                    "{build} is not a build task; only build tasks take a clean dependency"
                )));
            }
            None => return Err(WatchgraphError::TaskNotFound(build.to_string())),
        };
        if let Some(name) = existing {
            return Ok(name);
        }

        let clean = CleanTask::new(build.with_kind(TaskKind::Clean), dest);
        let clean_name = clean.name.clone();
        self.register(Task::Clean(clean.clone()))?;
        if let Some(Task::Build(task)) = self.tasks.get_mut(build.as_str()) {
            task.clean = Some(clean);
        }
        Ok(clean_name)
    }

    pub fn mocha(&mut self, opts: MochaOptions) -> Result<TaskName> {
        let name = self.name(TaskKind::Mocha, &opts.id)?;
        let tests = self.resolve_pattern(&opts.tests, DEFAULT_TEST_SUFFIX)?;
        self.register(Task::Test(MochaTask::new(name.clone(), tests)))?;

        if opts.watch {
            self.watch(
                &name,
                WatchOptions {
                    patterns: opts.watch_patterns,
                },
            )?;
        }
        Ok(name)
    }

    /// Declare the watch companion of `target`.
    ///
    /// Without explicit patterns a build companion watches the build's
    /// source, and a test companion is left empty here and filled in by
    /// [`Orchestrator::create_graph`] with every build output.
    pub fn watch(&mut self, target: &TaskName, opts: WatchOptions) -> Result<TaskName> {
        let task = self
            .tasks
            .get(target.as_str())
            .ok_or_else(|| WatchgraphError::TaskNotFound(target.to_string()))?;
        let kind = task.kind().watch_companion().ok_or_else(|| {
            WatchgraphError::ConfigError(format!("{target} has no watch companion"))
        })?;

        let (default_patterns, action) = match task {
            Task::Build(build) => (
                vec![build.src.clone()],
                WatchAction::Build {
                    tool: build.tool,
                    dest: build.dest.clone(),
                },
            ),
            _ => (
                Vec::new(),
                WatchAction::Rerun {
                    target: target.clone(),
                },
            ),
        };

        let patterns = match &opts.patterns {
            Some(sources) => self.resolve_patterns(sources)?,
            None => default_patterns,
        };

        let name = target.with_kind(kind);
        self.register(Task::Watch(WatchTask {
            name: name.clone(),
            patterns,
            paired: Some(target.clone()),
            action,
            skip_unchanged: self.skip_unchanged,
        }))?;
        Ok(name)
    }

    /// Watch arbitrary files and re-run the task named by `opts.run` on any
    /// change.
    pub fn watch_files(&mut self, opts: WatchFilesOptions) -> Result<TaskName> {
        let name = self.name(TaskKind::WatchFiles, &opts.id)?;
        if opts.patterns.is_empty() {
            return Err(WatchgraphError::MissingField(format!("{name}: patterns")));
        }
        let target: TaskName = opts.run.parse()?;
        let patterns = self.resolve_patterns(&opts.patterns)?;

        self.register(Task::Watch(WatchTask {
            name: name.clone(),
            patterns,
            paired: None,
            action: WatchAction::Rerun { target },
            skip_unchanged: self.skip_unchanged,
        }))?;
        Ok(name)
    }

    /// Synthesize the composite graph from everything declared so far.
    pub fn create_graph(&self) -> Result<TaskGraph> {
        let mut tasks = self.tasks.clone();

        let outputs = self
            .build_tasks()
            .map(BuildTask::output_pattern)
            .collect::<Result<Vec<_>>>()?;

        for task in tasks.values_mut() {
            let Task::Watch(watch) = task else { continue };
            if watch.name.kind() != TaskKind::WatchMocha || !watch.patterns.is_empty() {
                continue;
            }
            watch.patterns = if outputs.is_empty() {
                match watch.paired.as_ref().and_then(|p| self.tasks.get(p.as_str())) {
                    Some(Task::Test(mocha)) => vec![mocha.tests.clone()],
                    _ => Vec::new(),
                }
            } else {
                outputs.clone()
            };
            debug!(task = %watch.name, count = watch.patterns.len(), "resolved default watch set");
        }

        TaskGraph::new(tasks)
    }

    fn name(&self, kind: TaskKind, id: &str) -> Result<TaskName> {
        TaskName::new(kind, Some(&self.package_name), id)
    }

    fn register(&mut self, task: Task) -> Result<()> {
        let name = task.name().clone();
        if self.tasks.contains_key(&name) {
            return Err(WatchgraphError::DuplicateTask(name.to_string()));
        }
        debug!(task = %name, "declared");
        self.tasks.insert(name, task);
        Ok(())
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        self.package_root.join(path)
    }

    fn resolve_pattern(&self, source: &str, default_suffix: &str) -> Result<Pattern> {
        Pattern::resolve(&self.package_root, source, default_suffix, self.fs.as_ref())
    }

    fn resolve_patterns(&self, sources: &[String]) -> Result<Vec<Pattern>> {
        sources
            .iter()
            .map(|source| self.resolve_pattern(source, DEFAULT_WATCH_SUFFIX))
            .collect()
    }
}
