// src/plugins/registry.rs

//! Run-scoped plugin registry.
//!
//! Plugins are registered as a side effect of loading the bootstrap artifact
//! (executing a `plugins(...)` directive is what declares them), so the
//! registry is an explicit object shared through the run context rather than
//! a return value. It is append-only for the lifetime of a run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

use regex::Regex;
use tracing::{debug, info};

use crate::errors::{BuilddagError, Result};
use crate::plugins::resolver::DependencyResolver;

/// `group:artifact` or `group:artifact:version`.
static COORDINATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:\s]+:[^:\s]+(:[^:\s]+)?$").expect("coordinate regex is valid")
});

/// A declared plugin and its lazily resolved artifact location.
#[derive(Debug)]
pub struct PluginDescriptor {
    id: String,
    location: OnceLock<PathBuf>,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: OnceLock::new(),
        }
    }

    /// The coordinate as written in the directive.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location, if it has been resolved already.
    pub fn location(&self) -> Option<&Path> {
        self.location.get().map(PathBuf::as_path)
    }

    /// Resolve the artifact location, blocking on the resolver the first
    /// time and returning the cached value afterwards.
    ///
    /// Resolver errors are passed through unchanged.
    pub fn resolve(&self, resolver: &dyn DependencyResolver, repositories: &[String]) -> Result<PathBuf> {
        if let Some(path) = self.location.get() {
            return Ok(path.clone());
        }
        let path = resolver
            .resolve(&self.id, repositories)
            .map_err(BuilddagError::Resolution)?;
        debug!(plugin = %self.id, location = ?path, "resolved plugin");
        Ok(self.location.get_or_init(|| path).clone())
    }
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Mutex<Vec<Arc<PluginDescriptor>>>,
    repositories: Mutex<Vec<String>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin coordinate.
    ///
    /// Returns the new descriptor, or `None` if the same coordinate was
    /// already registered in this run.
    pub fn register(&self, coordinate: &str) -> Result<Option<Arc<PluginDescriptor>>> {
        let coordinate = coordinate.trim();
        if coordinate.is_empty() {
            return Err(BuilddagError::MissingDirectiveTarget("plugins".to_string()));
        }
        if !COORDINATE.is_match(coordinate) {
            return Err(BuilddagError::ConfigError(format!(
                "invalid plugin coordinate '{coordinate}' (expected group:artifact[:version])"
            )));
        }

        let mut plugins = self.plugins.lock().unwrap_or_else(|e| e.into_inner());
        if plugins.iter().any(|p| p.id() == coordinate) {
            debug!(plugin = %coordinate, "plugin already registered");
            return Ok(None);
        }

        let descriptor = Arc::new(PluginDescriptor::new(coordinate));
        plugins.push(Arc::clone(&descriptor));
        info!(plugin = %coordinate, "registered plugin");
        Ok(Some(descriptor))
    }

    /// Register a repository URL or path; duplicates are ignored.
    pub fn add_repository(&self, repository: &str) -> Result<bool> {
        let repository = repository.trim();
        if repository.is_empty() {
            return Err(BuilddagError::MissingDirectiveTarget("repos".to_string()));
        }
        let mut repos = self.repositories.lock().unwrap_or_else(|e| e.into_inner());
        if repos.iter().any(|r| r == repository) {
            return Ok(false);
        }
        repos.push(repository.to_string());
        debug!(repository = %repository, "registered repository");
        Ok(true)
    }

    /// Snapshot of every registered plugin, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<PluginDescriptor>> {
        self.plugins.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn repositories(&self) -> Vec<String> {
        self.repositories.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.plugins.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
