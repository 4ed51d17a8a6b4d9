// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuilddagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Duplicate project name: {0}")]
    DuplicateProject(String),

    #[error("Cycle detected in project graph: {0}")]
    DependencyCycle(String),

    #[error("Unknown project '{dependency}' (required by '{project}')")]
    UnknownProject { project: String, dependency: String },

    #[error("Directive `{0}` requires at least one non-empty argument")]
    MissingDirectiveTarget(String),

    #[error("Compilation of {script:?} failed: {message}")]
    CompilationFailed { script: PathBuf, message: String },

    /// The toolchain reported success but left no artifact behind.
    #[error("internal error: compiler reported success for {script:?} but {artifact:?} does not exist")]
    MissingArtifact { script: PathBuf, artifact: PathBuf },

    #[error("Failed to load module '{module}': {source}")]
    ModuleLoad {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load module '{module}' (no cause reported)")]
    ModuleUnavailable { module: String },

    #[error("Failed to invoke '{module}.{member}': {source}")]
    MemberInvoke {
        module: String,
        member: String,
        #[source]
        source: anyhow::Error,
    },

    /// Resolver failures pass through untouched.
    #[error(transparent)]
    Resolution(anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuilddagError {
    pub fn compilation(script: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::CompilationFailed {
            script: script.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error belongs to the configuration/validation family.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::DuplicateProject(_)
                | Self::DependencyCycle(_)
                | Self::UnknownProject { .. }
                | Self::MissingDirectiveTarget(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuilddagError>;
