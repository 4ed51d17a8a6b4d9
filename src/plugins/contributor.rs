// src/plugins/contributor.rs

use std::sync::Arc;

use crate::dag::ProjectNode;
use crate::load::LoadContext;
use crate::plugins::PluginDescriptor;

/// A project supplied by a plugin, together with the projects it depends on.
///
/// Dependencies need not be declared anywhere else; they join the graph as
/// leaf nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributedProject {
    pub project: ProjectNode,
    pub depends_on: Vec<ProjectNode>,
}

impl ContributedProject {
    pub fn new(project: ProjectNode, depends_on: Vec<ProjectNode>) -> Self {
        Self { project, depends_on }
    }
}

/// Plugin-owned source of additional projects.
///
/// Queried exactly once per pipeline run, after every script was harvested.
pub trait ProjectContributor: Send + Sync {
    fn contributed_projects(&self) -> Vec<ContributedProject>;
}

/// Hook run against every fresh load context before any module is loaded.
pub trait PluginInstaller: Send + Sync {
    fn install(&self, plugins: &[Arc<PluginDescriptor>], context: &mut dyn LoadContext);
}

/// Default installer: puts every resolved plugin artifact on the context's
/// search path so script modules can see plugin types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClasspathInstaller;

impl PluginInstaller for ClasspathInstaller {
    fn install(&self, plugins: &[Arc<PluginDescriptor>], context: &mut dyn LoadContext) {
        for plugin in plugins {
            if let Some(location) = plugin.location() {
                if !context.locations().iter().any(|l| l == location) {
                    context.add_location(location.to_path_buf());
                }
            }
        }
    }
}
