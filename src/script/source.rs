// src/script/source.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;

use crate::fs::FileSystem;

/// Immutable handle to a build-script file.
///
/// The timestamp is captured once, when the handle is created; the core never
/// mutates a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    path: PathBuf,
    name: String,
    modified: SystemTime,
}

impl ScriptSource {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            modified,
        }
    }

    /// Build a handle from disk (or a mock filesystem).
    ///
    /// The logical name is the path relative to `root` when the script lives
    /// below it, otherwise the bare file name.
    pub fn from_path(fs: &dyn FileSystem, root: &Path, path: &Path) -> Result<Self> {
        let modified = fs.modified(path)?;
        Ok(Self::new(path, logical_name(root, path), modified))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// File extension of the script, used for generated bootstrap sources.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

fn logical_name(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().replace('\\', "/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}
