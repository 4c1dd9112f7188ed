// src/task/clean.rs

use std::path::PathBuf;

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::task::name::TaskName;

/// Removes a destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTask {
    pub name: TaskName,
    pub dest: PathBuf,
}

impl CleanTask {
    pub fn new(name: TaskName, dest: impl Into<PathBuf>) -> Self {
        Self {
            name,
            dest: dest.into(),
        }
    }

    pub async fn run(&self, exec: &dyn ExecutorBackend) -> Result<()> {
        exec.remove(self.dest.clone()).await
    }
}
