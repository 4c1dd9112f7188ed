// tests/scheduler_core_properties.rs

use proptest::prelude::*;
use watchgraph::scheduler::{DebounceCore, SchedulerAction, SchedulerState};

#[derive(Debug, Clone, Copy)]
enum Input {
    Schedule,
    Timer,
    Finish,
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        3 => Just(Input::Schedule),
        1 => Just(Input::Timer),
        1 => Just(Input::Finish),
    ]
}

proptest! {
    /// Drive the core the way the async shell does: timers only fire when
    /// armed, runs only finish when started.
    #[test]
    fn at_most_one_run_in_flight(inputs in proptest::collection::vec(input(), 0..64)) {
        let mut core = DebounceCore::new();
        let mut timer_armed = false;
        let mut running = false;
        let mut schedules_since_run = 0usize;

        for input in inputs {
            let action = match input {
                Input::Schedule => {
                    schedules_since_run += 1;
                    core.schedule()
                }
                Input::Timer if timer_armed => {
                    timer_armed = false;
                    core.timer_elapsed()
                }
                Input::Finish if running => {
                    running = false;
                    core.run_finished()
                }
                _ => None,
            };

            match action {
                Some(SchedulerAction::StartTimer) => {
                    prop_assert!(!timer_armed, "timer armed twice");
                    timer_armed = true;
                }
                Some(SchedulerAction::Run) => {
                    prop_assert!(!running, "overlapping runs");
                    prop_assert!(schedules_since_run > 0, "run without a request");
                    running = true;
                    schedules_since_run = 0;
                }
                None => {}
            }

            let expected = match (running, timer_armed) {
                (false, false) => SchedulerState::Idle,
                (false, true) => SchedulerState::Scheduled,
                (true, false) => SchedulerState::Running,
                (true, true) => unreachable!("timer armed during a run"),
            };
            // A request during a run is remembered without arming a timer.
            if running && core.state() == SchedulerState::RunningAndScheduled {
                prop_assert!(schedules_since_run > 0);
            } else {
                prop_assert_eq!(core.state(), expected);
            }
        }
    }
}

#[test]
fn many_requests_during_run_leave_one_follow_up() {
    let mut core = DebounceCore::new();
    assert_eq!(core.schedule(), Some(SchedulerAction::StartTimer));
    assert_eq!(core.timer_elapsed(), Some(SchedulerAction::Run));
    for _ in 0..5 {
        assert_eq!(core.schedule(), None);
    }
    assert_eq!(core.state(), SchedulerState::RunningAndScheduled);
    assert_eq!(core.run_finished(), Some(SchedulerAction::StartTimer));
    assert_eq!(core.timer_elapsed(), Some(SchedulerAction::Run));
    assert_eq!(core.run_finished(), None);
    assert_eq!(core.state(), SchedulerState::Idle);
}
