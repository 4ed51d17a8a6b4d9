// src/watch/mod.rs

//! File watching for `--watch` mode.
//!
//! The watcher turns filesystem events into [`ScriptChange`]s; the rerun
//! loop coalesces changes that pile up while a run is in progress into a
//! single follow-up run.

pub mod rerun;
pub mod watcher;

pub use rerun::rerun_on_change;
pub use watcher::{spawn_watcher, ScriptChange, WatcherHandle};
