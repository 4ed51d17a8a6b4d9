// src/engine/context.rs

use crate::plugins::{PluginRegistry, TaskRegistry};

/// State shared by everything that happens during one pipeline run.
///
/// A fresh context is created per run and dropped at its end, so nothing
/// registered in one run leaks into the next.
#[derive(Debug, Default)]
pub struct RunContext {
    pub plugins: PluginRegistry,
    pub tasks: TaskRegistry,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}
