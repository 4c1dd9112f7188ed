// src/task/mod.rs

//! Declared units of work.
//!
//! - [`name`]: identity and grouping keys.
//! - [`clean`], [`build`], [`test`]: one-shot tasks delegating to the
//!   executor backend.
//! - [`watch`]: long-running tasks reacting to file events.
//! - [`runner`]: runs any of the above against a [`TaskContext`].

pub mod build;
pub mod clean;
pub mod name;
pub mod runner;
pub mod watch;

pub use build::{BuildTask, BuildTool};
pub use clean::CleanTask;
pub use name::{TaskKind, TaskName};
pub use runner::{TaskContext, TaskRunner};
pub use test::MochaTask;
pub use watch::{WatchAction, WatchHandle, WatchReaction, WatchTask};

/// Any declared task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Clean(CleanTask),
    Build(BuildTask),
    Test(MochaTask),
    Watch(WatchTask),
}

impl Task {
    pub fn name(&self) -> &TaskName {
        match self {
            Task::Clean(t) => &t.name,
            Task::Build(t) => &t.name,
            Task::Test(t) => &t.name,
            Task::Watch(t) => &t.name,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.name().kind()
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, Task::Watch(_))
    }

    /// Tasks that must succeed before this one runs.
    pub fn dependencies(&self) -> Vec<&TaskName> {
        match self {
            Task::Build(t) => t.dependencies(),
            _ => Vec::new(),
        }
    }

    pub fn as_build(&self) -> Option<&BuildTask> {
        match self {
            Task::Build(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_watch(&self) -> Option<&WatchTask> {
        match self {
            Task::Watch(t) => Some(t),
            _ => None,
        }
    }
}
