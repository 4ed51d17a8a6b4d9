// src/load/runtime.rs

//! The narrow reflection interface the loader is written against.
//!
//! A [`ModuleRuntime`] creates one isolated [`LoadContext`] per artifact
//! load. The context loads modules by name; a [`LoadedModule`] exposes the
//! declarations it executed on load and its introspectable members.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::dag::ProjectNode;
use crate::plugins::TaskMarker;

/// What an accessor hands back when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    Project,
    /// Any other type, by name.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Property-style accessor.
    Accessor {
        name: String,
        parameters: usize,
        /// Declared at module level rather than on an instance.
        module_level: bool,
        returns: ReturnKind,
    },
    Method {
        name: String,
        parameters: usize,
        marker: Option<TaskMarker>,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Accessor { name, .. } | Member::Method { name, .. } => name,
        }
    }

    /// Zero-argument, module-level accessor returning a project.
    pub fn is_project_accessor(&self) -> bool {
        matches!(
            self,
            Member::Accessor {
                parameters: 0,
                module_level: true,
                returns: ReturnKind::Project,
                ..
            }
        )
    }
}

/// Side effect a module performs while it is being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Plugins(Vec<String>),
    Repos(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValue {
    Project(ProjectNode),
    Other(String),
}

pub trait LoadedModule {
    fn name(&self) -> &str;

    /// Declarations executed when the module was loaded.
    fn declarations(&self) -> Vec<Declaration>;

    fn members(&self) -> Result<Vec<Member>>;

    fn invoke(&self, accessor: &str) -> Result<MemberValue>;
}

/// An isolated load scope over one artifact plus its auxiliary locations.
pub trait LoadContext {
    fn artifact(&self) -> &Path;

    fn locations(&self) -> &[PathBuf];

    fn add_location(&mut self, location: PathBuf);

    /// Load a module by its dotted name.
    ///
    /// `Ok(None)` means the module could not be found and the runtime had
    /// nothing more specific to say.
    fn load_module(&mut self, name: &str) -> Result<Option<Box<dyn LoadedModule>>>;
}

pub trait ModuleRuntime: Send + Sync {
    fn create_context(&self, artifact: &Path, classpath: &[PathBuf]) -> Result<Box<dyn LoadContext>>;
}
