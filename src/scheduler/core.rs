// src/scheduler/core.rs

//! Pure debounce/coalesce state machine.
//!
//! The core has no timers, no channels and no Tokio types. Each input returns
//! the single action (if any) that the async shell in
//! [`crate::scheduler::runtime`] must perform:
//!
//! | state               | input          | next state          | action       |
//! |---------------------|----------------|---------------------|--------------|
//! | Idle                | schedule       | Scheduled           | StartTimer   |
//! | Scheduled           | schedule       | Scheduled           | -            |
//! | Scheduled           | timer elapsed  | Running             | Run          |
//! | Running             | schedule       | RunningAndScheduled | -            |
//! | RunningAndScheduled | schedule       | RunningAndScheduled | -            |
//! | Running             | run finished   | Idle                | -            |
//! | RunningAndScheduled | run finished   | Scheduled           | StartTimer   |
//!
//! Any other (state, input) pair leaves the state untouched.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    /// A run is pending; the debounce timer is armed.
    Scheduled,
    /// The unit is executing and nothing else is pending.
    Running,
    /// The unit is executing and exactly one follow-up run is pending.
    RunningAndScheduled,
}

/// Side effect requested by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Arm the debounce timer.
    StartTimer,
    /// Invoke the wrapped unit.
    Run,
}

#[derive(Debug, Default)]
pub struct DebounceCore {
    state: SchedulerState,
}

impl DebounceCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// A run was requested.
    pub fn schedule(&mut self) -> Option<SchedulerAction> {
        let (next, action) = match self.state {
            SchedulerState::Idle => (SchedulerState::Scheduled, Some(SchedulerAction::StartTimer)),
            SchedulerState::Running => (SchedulerState::RunningAndScheduled, None),
            same @ (SchedulerState::Scheduled | SchedulerState::RunningAndScheduled) => (same, None),
        };
        self.transition("schedule", next);
        action
    }

    /// The debounce delay passed.
    pub fn timer_elapsed(&mut self) -> Option<SchedulerAction> {
        match self.state {
            SchedulerState::Scheduled => {
                self.transition("timer", SchedulerState::Running);
                Some(SchedulerAction::Run)
            }
            _ => None,
        }
    }

    /// The unit signalled completion (success and failure alike).
    pub fn run_finished(&mut self) -> Option<SchedulerAction> {
        match self.state {
            SchedulerState::Running => {
                self.transition("finished", SchedulerState::Idle);
                None
            }
            SchedulerState::RunningAndScheduled => {
                self.transition("finished", SchedulerState::Scheduled);
                Some(SchedulerAction::StartTimer)
            }
            _ => None,
        }
    }

    fn transition(&mut self, input: &str, next: SchedulerState) {
        if next != self.state {
            trace!(input, from = ?self.state, to = ?next, "scheduler transition");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_while_idle_arms_one_timer() {
        let mut core = DebounceCore::new();
        assert_eq!(core.schedule(), Some(SchedulerAction::StartTimer));
        for _ in 0..10 {
            assert_eq!(core.schedule(), None);
        }
        assert_eq!(core.state(), SchedulerState::Scheduled);
        assert_eq!(core.timer_elapsed(), Some(SchedulerAction::Run));
        assert_eq!(core.state(), SchedulerState::Running);
    }

    #[test]
    fn requests_during_run_coalesce_into_one_follow_up() {
        let mut core = DebounceCore::new();
        core.schedule();
        core.timer_elapsed();
        for _ in 0..5 {
            assert_eq!(core.schedule(), None);
        }
        assert_eq!(core.state(), SchedulerState::RunningAndScheduled);
        assert_eq!(core.run_finished(), Some(SchedulerAction::StartTimer));
        assert_eq!(core.state(), SchedulerState::Scheduled);
        assert_eq!(core.timer_elapsed(), Some(SchedulerAction::Run));
        assert_eq!(core.run_finished(), None);
        assert_eq!(core.state(), SchedulerState::Idle);
    }

    #[test]
    fn stray_inputs_are_ignored() {
        let mut core = DebounceCore::new();
        assert_eq!(core.timer_elapsed(), None);
        assert_eq!(core.run_finished(), None);
        assert_eq!(core.state(), SchedulerState::Idle);
    }
}
