// tests/scheduler_debounce.rs

mod common;
use crate::common::fakes::GatedUnit;
use crate::common::{init_tracing, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use watchgraph::errors::Result;
use watchgraph::exec::BoxFuture;
use watchgraph::scheduler::{Runnable, Scheduler, SchedulerState, DEFAULT_DEBOUNCE};

/// Panics on its first run, succeeds afterwards.
#[derive(Default)]
struct PanicsOnce {
    runs: AtomicUsize,
}

impl Runnable for PanicsOnce {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("unit blew up");
            }
            Ok(())
        })
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_requests_runs_once_after_delay() {
    init_tracing();
    let unit = GatedUnit::open();
    let scheduler = Scheduler::new("burst", DEFAULT_DEBOUNCE, unit.clone());

    for _ in 0..5 {
        scheduler.schedule();
    }

    sleep(DEFAULT_DEBOUNCE / 2).await;
    assert_eq!(unit.runs(), 0, "nothing runs before the delay");
    assert_eq!(scheduler.state(), SchedulerState::Scheduled);

    sleep(DEFAULT_DEBOUNCE).await;
    with_timeout(scheduler.wait_idle()).await;
    assert_eq!(unit.runs(), 1);
}

#[tokio::test(start_paused = true)]
async fn requests_during_a_run_coalesce_into_one_follow_up() {
    init_tracing();
    let unit = GatedUnit::new();
    let scheduler = Scheduler::new("coalesce", Duration::from_millis(100), unit.clone());

    scheduler.schedule();
    with_timeout(unit.started()).await;
    assert_eq!(unit.runs(), 1);

    for _ in 0..5 {
        scheduler.schedule();
    }
    // Let the driver see the requests while the first run is still blocked.
    sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.state(), SchedulerState::RunningAndScheduled);

    unit.release(2);
    sleep(Duration::from_millis(500)).await;
    with_timeout(scheduler.wait_idle()).await;
    assert_eq!(unit.runs(), 2, "exactly one follow-up run");
}

#[tokio::test(start_paused = true)]
async fn runs_never_overlap() {
    init_tracing();
    let unit = GatedUnit::new();
    let scheduler = Scheduler::new("overlap", Duration::from_millis(10), unit.clone());

    scheduler.schedule();
    with_timeout(unit.started()).await;

    // Long after the delay, the blocked run is still the only one.
    scheduler.schedule();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(unit.runs(), 1);

    unit.release(1);
    with_timeout(unit.started()).await;
    assert_eq!(unit.runs(), 2);
    unit.release(1);
    with_timeout(scheduler.wait_idle()).await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_run() {
    init_tracing();
    let unit = GatedUnit::open();
    let scheduler = Scheduler::new("shutdown", DEFAULT_DEBOUNCE, unit.clone());

    scheduler.schedule();
    scheduler.shutdown();
    scheduler.schedule();
    sleep(DEFAULT_DEBOUNCE * 3).await;
    assert_eq!(unit.runs(), 0);
}

#[tokio::test(start_paused = true)]
async fn wait_idle_covers_a_request_sent_just_before() {
    init_tracing();
    let unit = GatedUnit::open();
    let scheduler = Scheduler::new("fresh", DEFAULT_DEBOUNCE, unit.clone());

    scheduler.schedule();
    with_timeout(scheduler.wait_idle()).await;
    assert_eq!(unit.runs(), 1, "the wait lasted through the delay and the run");
}

#[tokio::test(start_paused = true)]
async fn panicking_run_returns_scheduler_to_idle() {
    init_tracing();
    let unit = Arc::new(PanicsOnce::default());
    let scheduler = Scheduler::new("panics", Duration::from_millis(10), unit.clone());

    scheduler.schedule();
    with_timeout(scheduler.wait_idle()).await;
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(unit.runs.load(Ordering::SeqCst), 1);

    scheduler.schedule();
    with_timeout(scheduler.wait_idle()).await;
    assert_eq!(unit.runs.load(Ordering::SeqCst), 2, "later requests still run");
}
