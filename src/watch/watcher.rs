// src/watch/watcher.rs

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchgraphError};
use crate::types::{FileEvent, FileEventKind};
use crate::watch::pattern::Pattern;

/// Stream of file events for one set of patterns.
///
/// Dropping or closing the subscription releases whatever the backend needed
/// to keep the watch alive.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<FileEvent>,
    guard: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("open", &self.guard.is_some())
            .finish()
    }
}

impl Subscription {
    /// `guard` is kept alive until the subscription is closed.
    pub fn new(events: mpsc::UnboundedReceiver<FileEvent>, guard: impl Any + Send) -> Self {
        Self {
            events,
            guard: Some(Box::new(guard)),
        }
    }

    /// Next event, or `None` once the subscription is closed and drained.
    pub async fn next(&mut self) -> Option<FileEvent> {
        self.events.recv().await
    }

    /// Tear down the subscription. Safe to call more than once.
    pub fn close(&mut self) {
        if self.guard.take().is_some() {
            debug!("watch subscription closed");
        }
        self.events.close();
    }
}

/// The external file-watch primitive.
pub trait WatchBackend: Send + Sync {
    /// Start watching. Every event delivered must match at least one of
    /// `patterns`.
    fn watch(&self, patterns: &[Pattern]) -> Result<Subscription>;
}

/// Cross-platform watcher backed by `notify`.
#[derive(Debug, Default, Clone)]
pub struct NotifyWatchBackend;

impl WatchBackend for NotifyWatchBackend {
    fn watch(&self, patterns: &[Pattern]) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel::<FileEvent>();
        let filter: Vec<Pattern> = patterns.to_vec();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for file_event in translate(&event) {
                        if !filter.iter().any(|p| p.matches(&file_event.path)) {
                            continue;
                        }
                        if tx.send(file_event).is_err() {
                            // Subscription closed; nothing left to deliver to.
                            return;
                        }
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )
        .map_err(|e| WatchgraphError::WatchInit(e.to_string()))?;

        for root in watch_roots(patterns) {
            watcher
                .watch(&root, RecursiveMode::Recursive)
                .map_err(|e| WatchgraphError::WatchInit(format!("{:?}: {e}", root)))?;
            info!("file watcher started on {:?}", root);
        }

        Ok(Subscription::new(rx, watcher))
    }
}

/// Distinct base directories, with bases nested inside another base dropped
/// (the recursive watch on the outer one already covers them).
fn watch_roots(patterns: &[Pattern]) -> Vec<PathBuf> {
    let bases: BTreeSet<PathBuf> = patterns.iter().map(Pattern::base_dir).collect();
    bases
        .iter()
        .filter(|b| !bases.iter().any(|other| other != *b && b.starts_with(other)))
        .cloned()
        .collect()
}

/// Map a raw notify event onto added/changed/deleted per path.
fn translate(event: &Event) -> Vec<FileEvent> {
    let kinds: Vec<FileEventKind> = match event.kind {
        EventKind::Create(_) => vec![FileEventKind::Added],
        EventKind::Remove(_) => vec![FileEventKind::Deleted],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => vec![FileEventKind::Deleted],
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => vec![FileEventKind::Added],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            vec![FileEventKind::Deleted, FileEventKind::Added]
        }
        EventKind::Modify(_) => vec![FileEventKind::Changed],
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let kind = kinds.get(i).or(kinds.last()).copied().unwrap_or(FileEventKind::Changed);
            FileEvent::new(kind, path.clone())
        })
        .collect()
}
