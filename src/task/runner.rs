// src/task/runner.rs

//! Executes tasks against an explicit [`TaskContext`].
//!
//! This is where run-time failures stop: every external call ends in
//! [`TaskRunner::settle`], which logs, notifies and turns the error into a
//! [`TaskOutcome`]. Nothing a single compile or test does can take a watch
//! process down.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::errors::{Result, WatchgraphError};
use crate::exec::{BoxFuture, ExecutorBackend, Notifier};
use crate::fs::FileSystem;
use crate::scheduler::DEFAULT_DEBOUNCE;
use crate::task::build::BuildTool;
use crate::task::name::TaskName;
use crate::task::watch::WatchHandle;
use crate::task::Task;
use crate::types::TaskOutcome;
use crate::watch::{Pattern, WatchBackend};

/// External collaborators every task runs against.
pub struct TaskContext {
    pub executor: Arc<dyn ExecutorBackend>,
    pub watcher: Arc<dyn WatchBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub fs: Arc<dyn FileSystem>,
    /// Delay for the schedulers owned by watch tasks.
    pub debounce: Duration,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("fs", &self.fs)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(
        executor: Arc<dyn ExecutorBackend>,
        watcher: Arc<dyn WatchBackend>,
        notifier: Arc<dyn Notifier>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            executor,
            watcher,
            notifier,
            fs,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Cheap-to-clone handle over the task table and its context.
#[derive(Clone)]
pub struct TaskRunner {
    ctx: Arc<TaskContext>,
    tasks: Arc<BTreeMap<TaskName, Task>>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("tasks", &self.tasks.len())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl TaskRunner {
    pub fn new(ctx: TaskContext, tasks: Arc<BTreeMap<TaskName, Task>>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tasks,
        }
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Run one concrete task, its dependencies first.
    ///
    /// A failing dependency skips the task for this invocation; the next
    /// trigger tries both again.
    pub fn run<'a>(&'a self, name: &'a str) -> BoxFuture<'a, TaskOutcome> {
        Box::pin(async move {
            let Some(task) = self.tasks.get(name) else {
                error!(task = name, "unknown task");
                return TaskOutcome::Failed;
            };

            for dep in task.dependencies() {
                let outcome = self.run(dep.as_str()).await;
                if !outcome.is_success() {
                    warn!(task = name, dependency = %dep, ?outcome, "dependency did not succeed; skipping");
                    return TaskOutcome::Skipped;
                }
            }

            let exec = self.ctx.executor.as_ref();
            let started = Instant::now();
            info!(task = name, "starting");
            let result = match task {
                Task::Clean(t) => t.run(exec).await,
                Task::Build(t) => t.run(exec).await,
                Task::Test(t) => t.run(exec).await,
                Task::Watch(_) => {
                    warn!(task = name, "watch tasks are started, not run");
                    return TaskOutcome::Skipped;
                }
            };
            self.settle(name, started, result)
        })
    }

    /// Run several tasks concurrently; no ordering between them beyond each
    /// one's own dependencies.
    ///
    /// A requested task that is also a dependency of another requested task
    /// only runs as that dependency, so it runs once and before its
    /// dependent. Its outcome is folded into the dependent's.
    pub async fn run_all(
        &self,
        names: impl IntoIterator<Item = TaskName>,
    ) -> BTreeMap<TaskName, TaskOutcome> {
        let requested: BTreeSet<TaskName> = names.into_iter().collect();
        let covered = self.dependency_closure(&requested);

        let mut set = JoinSet::new();
        for name in requested.into_iter().filter(|n| !covered.contains(n)) {
            let runner = self.clone();
            set.spawn(async move {
                let outcome = runner.run(name.as_str()).await;
                (name, outcome)
            });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    outcomes.insert(name, outcome);
                }
                Err(err) => error!(error = %err, "task panicked or was cancelled"),
            }
        }
        outcomes
    }

    /// Every task reachable through `dependencies()` from `roots`, excluding
    /// the roots themselves unless another root depends on them.
    fn dependency_closure(&self, roots: &BTreeSet<TaskName>) -> BTreeSet<TaskName> {
        let mut covered = BTreeSet::new();
        let mut stack: Vec<&TaskName> = roots
            .iter()
            .filter_map(|name| self.tasks.get(name))
            .flat_map(Task::dependencies)
            .collect();
        while let Some(dep) = stack.pop() {
            if covered.insert(dep.clone()) {
                if let Some(task) = self.tasks.get(dep) {
                    stack.extend(task.dependencies());
                }
            }
        }
        covered
    }

    /// Start a watch task by name.
    pub fn start_watch(&self, name: &str) -> Result<WatchHandle> {
        match self.tasks.get(name) {
            Some(Task::Watch(task)) => task.start(self),
            Some(_) => Err(WatchgraphError::ConfigError(format!("{name} is not a watch task"))),
            None => Err(WatchgraphError::TaskNotFound(name.to_string())),
        }
    }

    /// Compile one file on behalf of a watch task.
    pub async fn compile_file(&self, label: &str, tool: BuildTool, source: Pattern, dest: PathBuf) -> TaskOutcome {
        let started = Instant::now();
        info!(task = label, source = %source, "compiling");
        let result = self.ctx.executor.compile(tool, source, dest).await;
        self.settle(label, started, result)
    }

    /// Remove one output on behalf of a watch task.
    pub async fn remove_output(&self, label: &str, path: PathBuf) -> TaskOutcome {
        let started = Instant::now();
        info!(task = label, path = ?path, "removing output");
        let result = self.ctx.executor.remove(path).await;
        self.settle(label, started, result)
    }

    fn settle(&self, label: &str, started: Instant, result: Result<()>) -> TaskOutcome {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                info!(task = label, elapsed_ms, "finished");
                TaskOutcome::Success
            }
            Err(err) => {
                error!(task = label, elapsed_ms, error = %err, "failed");
                self.ctx.notifier.notify(&format!("{label} failed"), &err.to_string());
                TaskOutcome::Failed
            }
        }
    }
}
