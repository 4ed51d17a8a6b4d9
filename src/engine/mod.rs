// src/engine/mod.rs

//! Orchestration engine for builddag.
//!
//! This module ties together:
//! - the run-scoped plugin and task registries ([`context`])
//! - the per-script compile/load pipeline and graph assembly ([`pipeline`])
//! - publication of finished project orders to subscribers ([`notifier`])

pub mod context;
pub mod notifier;
pub mod pipeline;

pub use context::RunContext;
pub use notifier::ChangeNotifier;
pub use pipeline::{Pipeline, PipelineOptions, RunOutcome, ScriptReport};
