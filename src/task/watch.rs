// src/task/watch.rs

//! Watch tasks: subscribe to file events and re-trigger narrow work.
//!
//! What an event means is decided by [`WatchAction`] in plain functions
//! (`on_added` / `on_changed` / `on_deleted`) returning a [`WatchReaction`];
//! the event loop started by [`WatchTask::start`] only executes reactions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchgraphError};
use crate::exec::BoxFuture;
use crate::scheduler::{Runnable, Scheduler};
use crate::task::build::BuildTool;
use crate::task::name::TaskName;
use crate::task::runner::TaskRunner;
use crate::types::{FileEvent, FileEventKind, TaskOutcome};
use crate::watch::{compute_file_hash, ContentHashes, Pattern, Subscription};

/// What a watch task does with matching events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Recompile only the file that changed; remove its output when the
    /// source goes away.
    Build { tool: BuildTool, dest: PathBuf },
    /// Re-run `target` in full, debounced.
    Rerun { target: TaskName },
}

/// The effect of one routed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchReaction {
    Compile {
        tool: BuildTool,
        source: Pattern,
        dest: PathBuf,
    },
    Remove(PathBuf),
    Schedule,
    Ignore,
}

impl WatchAction {
    pub fn on_added(&self, pattern: &Pattern, rel: &str) -> WatchReaction {
        match self {
            WatchAction::Build { tool, dest } => compile_one(*tool, pattern, rel, dest),
            WatchAction::Rerun { .. } => WatchReaction::Schedule,
        }
    }

    pub fn on_changed(&self, pattern: &Pattern, rel: &str) -> WatchReaction {
        match self {
            WatchAction::Build { tool, dest } => compile_one(*tool, pattern, rel, dest),
            WatchAction::Rerun { .. } => WatchReaction::Schedule,
        }
    }

    pub fn on_deleted(&self, _pattern: &Pattern, rel: &str) -> WatchReaction {
        match self {
            WatchAction::Build { tool, dest } => WatchReaction::Remove(dest.join(tool.output_rel(rel))),
            WatchAction::Rerun { .. } => WatchReaction::Schedule,
        }
    }

    pub fn react(&self, kind: FileEventKind, pattern: &Pattern, rel: &str) -> WatchReaction {
        match kind {
            FileEventKind::Added => self.on_added(pattern, rel),
            FileEventKind::Changed => self.on_changed(pattern, rel),
            FileEventKind::Deleted => self.on_deleted(pattern, rel),
        }
    }
}

fn compile_one(tool: BuildTool, pattern: &Pattern, rel: &str, dest: &Path) -> WatchReaction {
    match pattern.scoped(rel) {
        Ok(source) => WatchReaction::Compile {
            tool,
            source,
            dest: dest.to_path_buf(),
        },
        Err(err) => {
            warn!(rel, error = %err, "cannot scope pattern to changed file; ignoring");
            WatchReaction::Ignore
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTask {
    pub name: TaskName,
    pub patterns: Vec<Pattern>,
    /// The non-watch task this one re-triggers, if any.
    pub paired: Option<TaskName>,
    pub action: WatchAction,
    /// Drop `changed` events whose content hash did not change.
    pub skip_unchanged: bool,
}

impl WatchTask {
    /// First pattern (in declaration order) matching `path`, with the
    /// relative fragment it matched.
    pub fn route(&self, path: &Path) -> Option<(&Pattern, String)> {
        self.patterns
            .iter()
            .find_map(|p| p.relative(path).map(|rel| (p, rel)))
    }

    /// Subscribe and start handling events.
    ///
    /// A subscription failure is returned here; the task cannot run without
    /// one. On success the returned handle stops the task.
    pub fn start(&self, runner: &TaskRunner) -> Result<WatchHandle> {
        if self.patterns.is_empty() {
            return Err(WatchgraphError::WatchInit(format!(
                "{} has no patterns to watch",
                self.name
            )));
        }

        let ctx = runner.context();
        let subscription = ctx.watcher.watch(&self.patterns).map_err(|err| match err {
            WatchgraphError::WatchInit(msg) => WatchgraphError::WatchInit(format!("{}: {msg}", self.name)),
            other => other,
        })?;

        let scheduler = match &self.action {
            WatchAction::Rerun { target } => Some(Scheduler::new(
                self.name.as_str(),
                ctx.debounce,
                Arc::new(RerunUnit {
                    runner: runner.clone(),
                    target: target.clone(),
                }),
            )),
            WatchAction::Build { .. } => None,
        };

        let globs: Vec<String> = self.patterns.iter().map(Pattern::to_absolute_glob).collect();
        info!(task = %self.name, ?globs, "watching");

        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let event_loop = EventLoop {
            task: self.clone(),
            runner: runner.clone(),
            scheduler,
            hashes: ContentHashes::new(),
        };
        tokio::spawn(event_loop.run(subscription, stop_rx, done_tx));

        Ok(WatchHandle {
            name: self.name.clone(),
            stop_tx: Some(stop_tx),
            done_rx,
        })
    }
}

/// Running watch task.
///
/// `stop()` may be called any number of times; `stopped()` consumes the
/// handle, so completion is observed at most once. Dropping the handle also
/// stops the task.
pub struct WatchHandle {
    name: TaskName,
    stop_tx: Option<oneshot::Sender<()>>,
    done_rx: oneshot::Receiver<Result<()>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("name", &self.name)
            .field("stopping", &self.stop_tx.is_none())
            .finish()
    }
}

impl WatchHandle {
    pub fn name(&self) -> &TaskName {
        &self.name
    }

    /// Tear down the subscription. Work already in flight is not cancelled,
    /// but nothing new is started.
    pub fn stop(&mut self) {
        match self.stop_tx.take() {
            Some(tx) => {
                debug!(task = %self.name, "stop requested");
                let _ = tx.send(());
            }
            None => debug!(task = %self.name, "already stopping"),
        }
    }

    /// Resolves once the event loop has shut down.
    pub async fn stopped(self) -> Result<()> {
        match self.done_rx.await {
            Ok(result) => result,
            // The loop always reports before exiting unless the runtime is
            // shutting down under it.
            Err(_) => Ok(()),
        }
    }
}

struct EventLoop {
    task: WatchTask,
    runner: TaskRunner,
    scheduler: Option<Scheduler>,
    hashes: ContentHashes,
}

impl EventLoop {
    async fn run(
        mut self,
        mut subscription: Subscription,
        mut stop_rx: oneshot::Receiver<()>,
        done_tx: oneshot::Sender<Result<()>>,
    ) {
        loop {
            tokio::select! {
                // A dropped handle counts as a stop request.
                _ = &mut stop_rx => break,
                event = subscription.next() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        debug!(task = %self.task.name, "subscription ended");
                        break;
                    }
                },
            }
        }

        subscription.close();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
        info!(task = %self.task.name, "watch stopped");
        let _ = done_tx.send(Ok(()));
    }

    async fn handle(&mut self, event: FileEvent) {
        let Some((pattern, rel)) = self.task.route(&event.path) else {
            debug!(task = %self.task.name, path = ?event.path, "event matches no pattern; ignoring");
            return;
        };
        let pattern = pattern.clone();

        if self.task.skip_unchanged && !self.content_changed(&event).await {
            return;
        }

        info!(task = %self.task.name, kind = %event.kind, path = %rel, "file event");

        match self.task.action.react(event.kind, &pattern, &rel) {
            WatchReaction::Compile { tool, source, dest } => {
                let runner = self.runner.clone();
                let label = self.task.name.to_string();
                tokio::spawn(async move {
                    runner.compile_file(&label, tool, source, dest).await;
                });
            }
            WatchReaction::Remove(path) => {
                let runner = self.runner.clone();
                let label = self.task.name.to_string();
                tokio::spawn(async move {
                    runner.remove_output(&label, path).await;
                });
            }
            WatchReaction::Schedule => {
                if let Some(scheduler) = &self.scheduler {
                    scheduler.schedule();
                }
            }
            WatchReaction::Ignore => {
                debug!(task = %self.task.name, kind = %event.kind, path = %rel, "no handler; ignoring");
            }
        }
    }

    async fn content_changed(&mut self, event: &FileEvent) -> bool {
        let hash = if event.kind == FileEventKind::Deleted {
            None
        } else {
            let fs = Arc::clone(&self.runner.context().fs);
            let path = event.path.clone();
            tokio::task::spawn_blocking(move || compute_file_hash(fs.as_ref(), &path).ok())
                .await
                .unwrap_or(None)
        };
        self.hashes.observe(event.kind, &event.path, hash)
    }
}

/// Scheduler unit that re-runs one task through the runner.
struct RerunUnit {
    runner: TaskRunner,
    target: TaskName,
}

impl Runnable for RerunUnit {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match self.runner.run(self.target.as_str()).await {
                TaskOutcome::Success => Ok(()),
                outcome => Err(WatchgraphError::CommandFailed {
                    task: self.target.to_string(),
                    message: format!("{outcome:?}"),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::name::TaskKind;

    fn babel_watch() -> WatchTask {
        let name = TaskName::new(TaskKind::WatchBabel, Some("pkg"), "src").unwrap();
        WatchTask {
            paired: Some(name.with_kind(TaskKind::Babel)),
            name,
            patterns: vec![Pattern::new("/pkg/src", "**/*.js").unwrap()],
            action: WatchAction::Build {
                tool: BuildTool::Babel,
                dest: PathBuf::from("/pkg/lib"),
            },
            skip_unchanged: false,
        }
    }

    #[test]
    fn changed_file_compiles_only_that_file() {
        let task = babel_watch();
        let (pattern, rel) = task.route(Path::new("/pkg/src/a/b.js")).unwrap();
        assert_eq!(rel, "a/b.js");

        match task.action.react(FileEventKind::Changed, pattern, &rel) {
            WatchReaction::Compile { tool, source, dest } => {
                assert_eq!(tool, BuildTool::Babel);
                assert_eq!(source.to_absolute_glob(), "/pkg/src/a/b.js");
                assert_eq!(dest, PathBuf::from("/pkg/lib"));
            }
            other => panic!("expected compile, got {other:?}"),
        }
    }

    #[test]
    fn deleted_file_removes_its_output() {
        let task = babel_watch();
        let pattern = &task.patterns[0];
        assert_eq!(
            task.action.react(FileEventKind::Deleted, pattern, "a/b.js"),
            WatchReaction::Remove(PathBuf::from("/pkg/lib/a/b.js"))
        );

        let less = WatchAction::Build {
            tool: BuildTool::Less,
            dest: PathBuf::from("/pkg/css"),
        };
        assert_eq!(
            less.on_deleted(pattern, "theme/site.less"),
            WatchReaction::Remove(PathBuf::from("/pkg/css/theme/site.css"))
        );
    }

    #[test]
    fn rerun_action_schedules_on_every_kind() {
        let target = TaskName::new(TaskKind::Mocha, None, "unit").unwrap();
        let action = WatchAction::Rerun { target };
        let pattern = Pattern::new("/pkg/lib", "**/*").unwrap();
        for kind in [FileEventKind::Added, FileEventKind::Changed, FileEventKind::Deleted] {
            assert_eq!(action.react(kind, &pattern, "x.js"), WatchReaction::Schedule);
        }
    }

    #[test]
    fn unmatched_path_is_not_routed() {
        assert!(babel_watch().route(Path::new("/pkg/src/a/b.css")).is_none());
        assert!(babel_watch().route(Path::new("/other/a.js")).is_none());
    }
}
