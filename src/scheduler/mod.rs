// src/scheduler/mod.rs

//! Debounced run scheduling for watch tasks.
//!
//! The pure state machine lives in [`core`]; the Tokio shell that owns the
//! timer and invokes the unit is implemented in [`runtime`].

pub mod core;
pub mod runtime;

pub use self::core::{DebounceCore, SchedulerAction, SchedulerState};
pub use self::runtime::{Runnable, Scheduler, DEFAULT_DEBOUNCE};
