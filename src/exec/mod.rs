// src/exec/mod.rs

//! External primitive layer.
//!
//! - [`backend`] defines the [`ExecutorBackend`] and [`Notifier`] seams that
//!   tasks call into, plus the `BoxFuture` alias used at async seams.
//! - [`command`] implements the backend with shell commands
//!   (`tokio::process::Command`) built from configurable templates.

pub mod backend;
pub mod command;

pub use backend::{BoxFuture, ExecutorBackend, LogNotifier, Notifier, SilentNotifier};
pub use command::{CommandTemplates, ShellExecutor};
