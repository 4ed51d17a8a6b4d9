// src/plugins/tasks.rs

use std::sync::Mutex;

use serde::Deserialize;
use tracing::debug;

/// Metadata carried by the task marker on an entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskMarker {
    /// Task name; falls back to the method name when empty.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub runs_before: Vec<String>,

    #[serde(default)]
    pub runs_after: Vec<String>,

    #[serde(default)]
    pub always_run_after: Vec<String>,
}

/// A discovered, marked entry point, waiting for the task engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntryPoint {
    pub module: String,
    pub method: String,
    pub marker: TaskMarker,
}

impl TaskEntryPoint {
    pub fn task_name(&self) -> &str {
        if self.marker.name.is_empty() {
            &self.method
        } else {
            &self.marker.name
        }
    }
}

/// Append-only list of task entry points found during a run.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<Vec<TaskEntryPoint>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, task: TaskEntryPoint) {
        debug!(
            task = %task.task_name(),
            module = %task.module,
            method = %task.method,
            "registered task entry point"
        );
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).push(task);
    }

    pub fn snapshot(&self) -> Vec<TaskEntryPoint> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn find(&self, name: &str) -> Option<TaskEntryPoint> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|t| t.task_name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
