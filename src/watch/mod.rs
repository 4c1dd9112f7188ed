// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - [`Pattern`]: base directory + glob suffix pairs, used both to subscribe
//!   and to route events back to the pattern (and relative path) that
//!   matched.
//! - [`WatchBackend`]: the subscription seam, with a `notify`-based
//!   implementation for production.
//! - Content hashing, so no-op `changed` events can be dropped.
//!
//! It does **not** know about tasks; watch tasks in [`crate::task`] decide
//! what an event means.

pub mod hash;
pub mod path_utils;
pub mod pattern;
pub mod watcher;

pub use hash::{compute_file_hash, ContentHashes};
pub use pattern::{has_glob_meta, Pattern};
pub use watcher::{NotifyWatchBackend, Subscription, WatchBackend};
