// src/exec/backend.rs

//! Seams for the external primitives a task delegates to.
//!
//! Tasks never compile, test or delete anything themselves; they call an
//! [`ExecutorBackend`]. Production uses
//! [`ShellExecutor`](crate::exec::command::ShellExecutor); tests swap in a
//! recording fake. Failures are plain `Err`s here; turning them into logs and
//! notifications happens in the task runner.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::warn;

use crate::errors::Result;
use crate::task::BuildTool;
use crate::watch::Pattern;

/// Boxed, sendable future used at every async trait seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ExecutorBackend: Send + Sync {
    /// Transform every file matched by `source` into `dest`, keeping each
    /// file's path relative to the pattern base (`base/a/b.js` lands in
    /// `dest/a/b.js`).
    fn compile(&self, tool: BuildTool, source: Pattern, dest: PathBuf) -> BoxFuture<'_, Result<()>>;

    /// Run the test suite selected by `tests`.
    fn run_tests(&self, tests: Pattern) -> BoxFuture<'_, Result<()>>;

    /// Recursively remove `path`. A missing path is not an error.
    fn remove(&self, path: PathBuf) -> BoxFuture<'_, Result<()>>;
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        warn!(title, message, "notification");
    }
}

/// Notifier that drops everything (`notify = false` in the config).
#[derive(Debug, Default, Clone)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}
