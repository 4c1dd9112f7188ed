// src/types.rs

//! Small value types shared by the watcher, the tasks and the scheduler.

use std::fmt;
use std::path::PathBuf;

/// Outcome of one run of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
    /// The task was not run because one of its dependencies failed.
    Skipped,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Kind of file-system change reported by a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Added,
    Changed,
    Deleted,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileEventKind::Added => "added",
            FileEventKind::Changed => "changed",
            FileEventKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A single change notification for an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Added, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Changed, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Deleted, path)
    }
}
