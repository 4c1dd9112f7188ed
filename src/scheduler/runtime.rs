// src/scheduler/runtime.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::errors::{Result, WatchgraphError};
use crate::exec::BoxFuture;

use super::core::{DebounceCore, SchedulerAction, SchedulerState};

/// Reference debounce delay: long enough to swallow one editor-save burst.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// One asynchronous unit of work driven by a [`Scheduler`].
///
/// The returned future resolving is the completion signal. Reporting a
/// failure (logging, notifications) is the unit's job; the scheduler only
/// notes that the run ended.
pub trait Runnable: Send + Sync {
    fn run(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Debug)]
enum Message {
    Schedule,
    TimerElapsed,
    RunFinished(Result<()>),
    Shutdown,
}

/// What the driver publishes after each message: the state plus how many
/// `schedule()` requests it has consumed so far.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: SchedulerState,
    scheduled: u64,
}

/// Debounced, coalescing run controller around one [`Runnable`].
///
/// All state lives in a single Tokio task; this handle only sends it
/// messages. At most one invocation of the unit is ever in flight, and any
/// number of `schedule()` calls during a run collapse into one follow-up.
/// Dropping the handle stops further runs; a run already in flight is left
/// to finish.
pub struct Scheduler {
    name: String,
    tx: mpsc::UnboundedSender<Message>,
    /// `schedule()` calls sent so far.
    requested: AtomicU64,
    state_rx: watch::Receiver<Snapshot>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Scheduler {
    /// Spawn the scheduler's driver task. Must be called inside a Tokio
    /// runtime.
    pub fn new(name: impl Into<String>, delay: Duration, unit: Arc<dyn Runnable>) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Snapshot {
            state: SchedulerState::Idle,
            scheduled: 0,
        });

        let driver = Driver {
            name: name.clone(),
            delay,
            unit,
            core: DebounceCore::new(),
            tx: tx.clone(),
            rx,
            state_tx,
            scheduled: 0,
            timer: None,
        };
        tokio::spawn(driver.run());

        Self {
            name,
            tx,
            requested: AtomicU64::new(0),
            state_rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request a run.
    pub fn schedule(&self) {
        if self.tx.send(Message::Schedule).is_ok() {
            self.requested.fetch_add(1, Ordering::SeqCst);
        } else {
            debug!(scheduler = %self.name, "schedule() after shutdown; ignoring");
        }
    }

    /// Last state published by the driver.
    pub fn state(&self) -> SchedulerState {
        self.state_rx.borrow().state
    }

    /// Wait until the scheduler has nothing running and nothing pending.
    ///
    /// Every `schedule()` that returned before this call is accounted for:
    /// the wait does not end until the driver has consumed those requests
    /// and the runs they caused have finished.
    pub async fn wait_idle(&self) {
        let requested = self.requested.load(Ordering::SeqCst);
        let mut rx = self.state_rx.clone();
        // Err only if the driver is gone, in which case nothing will run.
        let _ = rx
            .wait_for(|s| s.scheduled >= requested && s.state == SchedulerState::Idle)
            .await;
    }

    /// Stop scheduling new runs. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Driver {
    name: String,
    delay: Duration,
    unit: Arc<dyn Runnable>,
    core: DebounceCore,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    state_tx: watch::Sender<Snapshot>,
    scheduled: u64,
    /// The single armed debounce timer, if any.
    timer: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(mut self) {
        debug!(scheduler = %self.name, delay_ms = self.delay.as_millis() as u64, "scheduler started");

        while let Some(msg) = self.rx.recv().await {
            let action = match msg {
                Message::Schedule => {
                    self.scheduled += 1;
                    self.core.schedule()
                }
                Message::TimerElapsed => {
                    self.timer = None;
                    self.core.timer_elapsed()
                }
                Message::RunFinished(result) => {
                    if let Err(err) = result {
                        debug!(scheduler = %self.name, error = %err, "run finished with failure");
                    }
                    self.core.run_finished()
                }
                Message::Shutdown => {
                    if let Some(timer) = self.timer.take() {
                        timer.abort();
                    }
                    break;
                }
            };

            self.state_tx.send_replace(Snapshot {
                state: self.core.state(),
                scheduled: self.scheduled,
            });

            match action {
                Some(SchedulerAction::StartTimer) => self.start_timer(),
                Some(SchedulerAction::Run) => self.start_run(),
                None => {}
            }
        }

        debug!(scheduler = %self.name, "scheduler stopped");
    }

    fn start_timer(&mut self) {
        let tx = self.tx.clone();
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Message::TimerElapsed);
        }));
    }

    fn start_run(&mut self) {
        debug!(scheduler = %self.name, "running unit");
        let unit = Arc::clone(&self.unit);
        let tx = self.tx.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            // A panicking unit must still end the run, or the scheduler would
            // stay `Running` and swallow every later request.
            let result = match tokio::spawn(async move { unit.run().await }).await {
                Ok(result) => result,
                Err(err) => {
                    error!(scheduler = %name, error = %err, "run panicked");
                    Err(WatchgraphError::CommandFailed {
                        task: name,
                        message: format!("run panicked: {err}"),
                    })
                }
            };
            // The driver may already be shut down; nothing to tell then.
            let _ = tx.send(Message::RunFinished(result));
        });
    }
}
