//! In-memory stand-ins for the external collaborators.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Notify, Semaphore};
use watchgraph::errors::{Result, WatchgraphError};
use watchgraph::exec::{BoxFuture, ExecutorBackend, Notifier};
use watchgraph::scheduler::Runnable;
use watchgraph::task::BuildTool;
use watchgraph::types::FileEvent;
use watchgraph::watch::{Pattern, Subscription, WatchBackend};

/// One call made against a [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecCall {
    Compile {
        tool: BuildTool,
        /// Absolute source glob.
        source: String,
        dest: PathBuf,
    },
    RunTests(String),
    Remove(PathBuf),
}

impl ExecCall {
    fn label(&self) -> &'static str {
        match self {
            ExecCall::Compile { .. } => "compile",
            ExecCall::RunTests(_) => "test",
            ExecCall::Remove(_) => "remove",
        }
    }
}

/// Executor that records every call and completes immediately.
///
/// `fail("compile" | "test" | "remove")` makes calls of that kind return
/// an error (after being recorded).
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<ExecCall>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
    changed: Arc<Notify>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, kind: &'static str) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` calls have been recorded.
    pub async fn wait_for_calls(&self, n: usize) -> Vec<ExecCall> {
        loop {
            let notified = self.changed.notified();
            let calls = self.calls();
            if calls.len() >= n {
                return calls;
            }
            notified.await;
        }
    }

    fn record(&self, call: ExecCall) -> Result<()> {
        let label = call.label();
        self.calls.lock().unwrap().push(call);
        self.changed.notify_waiters();
        if self.failing.lock().unwrap().contains(label) {
            return Err(WatchgraphError::CommandFailed {
                task: label.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn compile(&self, tool: BuildTool, source: Pattern, dest: PathBuf) -> BoxFuture<'_, Result<()>> {
        let call = ExecCall::Compile {
            tool,
            source: source.to_absolute_glob(),
            dest,
        };
        Box::pin(async move { self.record(call) })
    }

    fn run_tests(&self, tests: Pattern) -> BoxFuture<'_, Result<()>> {
        let call = ExecCall::RunTests(tests.to_absolute_glob());
        Box::pin(async move { self.record(call) })
    }

    fn remove(&self, path: PathBuf) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record(ExecCall::Remove(path)) })
    }
}

#[derive(Debug, Default)]
struct WatchState {
    senders: Vec<mpsc::UnboundedSender<FileEvent>>,
    watched: Vec<Vec<String>>,
    fail_with: Option<String>,
}

/// Watch backend whose subscriptions are fed by the test via [`emit`].
///
/// [`emit`]: ChannelWatchBackend::emit
#[derive(Debug, Clone, Default)]
pub struct ChannelWatchBackend {
    state: Arc<Mutex<WatchState>>,
    closed: Arc<AtomicUsize>,
}

/// Dropped when a subscription closes.
struct CloseGuard(Arc<AtomicUsize>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ChannelWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `watch()` call fail with `WatchInit`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_with = Some(message.into());
    }

    /// Deliver an event to every open subscription.
    pub fn emit(&self, event: FileEvent) {
        let mut state = self.state.lock().unwrap();
        state.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Glob lists passed to each `watch()` call, in order.
    pub fn watched(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().watched.clone()
    }

    /// Number of subscriptions closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl WatchBackend for ChannelWatchBackend {
    fn watch(&self, patterns: &[Pattern]) -> Result<Subscription> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.fail_with {
            return Err(WatchgraphError::WatchInit(message.clone()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.senders.push(tx);
        state
            .watched
            .push(patterns.iter().map(Pattern::to_absolute_glob).collect());
        Ok(Subscription::new(rx, CloseGuard(Arc::clone(&self.closed))))
    }
}

/// Notifier that keeps every `(title, message)` pair.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

/// Scheduler unit that counts runs and blocks each one until released.
#[derive(Debug)]
pub struct GatedUnit {
    runs: AtomicUsize,
    started: Notify,
    gate: Semaphore,
}

impl GatedUnit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_permits(0))
    }

    /// A unit that never blocks.
    pub fn open() -> Arc<Self> {
        Arc::new(Self::with_permits(Semaphore::MAX_PERMITS))
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            runs: AtomicUsize::new(0),
            started: Notify::new(),
            gate: Semaphore::new(permits),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Resolves once a run has started (immediately if one already did and
    /// nobody consumed the signal).
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Let `n` more runs finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

impl Runnable for GatedUnit {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            Ok(())
        })
    }
}
