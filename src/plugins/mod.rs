// src/plugins/mod.rs

//! Plugin-facing state and seams.
//!
//! - [`registry`] holds declared plugins and repositories for a run.
//! - [`tasks`] holds task entry points discovered in script modules.
//! - [`resolver`] turns plugin coordinates into artifact paths.
//! - [`contributor`] defines the project-contributor and installer hooks.

pub mod contributor;
pub mod registry;
pub mod resolver;
pub mod tasks;

pub use contributor::{ClasspathInstaller, ContributedProject, PluginInstaller, ProjectContributor};
pub use registry::{PluginDescriptor, PluginRegistry};
pub use resolver::{DependencyResolver, LocalRepositoryResolver};
pub use tasks::{TaskEntryPoint, TaskMarker, TaskRegistry};
