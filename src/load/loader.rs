// src/load/loader.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::dag::ProjectNode;
use crate::engine::RunContext;
use crate::errors::{BuilddagError, Result};
use crate::load::archive::{list_modules, SCRIPT_MODULE};
use crate::load::runtime::{Declaration, LoadedModule, Member, MemberValue, ModuleRuntime};
use crate::plugins::{PluginInstaller, TaskEntryPoint};

/// Everything harvested from one artifact load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    pub modules: Vec<String>,
    pub projects: Vec<ProjectNode>,
    pub tasks: Vec<TaskEntryPoint>,
}

/// Loads compiled artifacts and harvests the entities they declare.
#[derive(Clone)]
pub struct ArtifactLoader {
    runtime: Arc<dyn ModuleRuntime>,
    installer: Arc<dyn PluginInstaller>,
}

impl ArtifactLoader {
    pub fn new(runtime: Arc<dyn ModuleRuntime>, installer: Arc<dyn PluginInstaller>) -> Self {
        Self { runtime, installer }
    }

    /// Load `artifact` in a fresh context scoped to `classpath` and harvest
    /// its projects and task entry points.
    ///
    /// Harvested projects are appended to `accumulated`; a name that is
    /// already present there, or appears twice in this artifact, is fatal.
    #[instrument(skip_all, fields(artifact = ?artifact))]
    pub fn load(
        &self,
        artifact: &Path,
        classpath: &[PathBuf],
        run: &RunContext,
        accumulated: &mut Vec<ProjectNode>,
    ) -> Result<Harvest> {
        let mut context = self.runtime.create_context(artifact, classpath)?;
        self.installer.install(&run.plugins.snapshot(), context.as_mut());

        let mut harvest = Harvest::default();
        for module_name in list_modules(artifact)? {
            if module_name == SCRIPT_MODULE {
                continue;
            }

            let module = match context.load_module(&module_name) {
                Ok(Some(m)) => m,
                Ok(None) => return Err(BuilddagError::ModuleUnavailable { module: module_name }),
                Err(source) => {
                    return Err(BuilddagError::ModuleLoad {
                        module: module_name,
                        source,
                    });
                }
            };

            apply_declarations(module.as_ref(), run)?;
            introspect(module.as_ref(), &mut harvest, run)?;
            harvest.modules.push(module_name);
        }

        merge_unique(accumulated, &harvest.projects)?;

        info!(
            modules = harvest.modules.len(),
            projects = harvest.projects.len(),
            tasks = harvest.tasks.len(),
            "artifact loaded"
        );
        Ok(harvest)
    }
}

fn apply_declarations(module: &dyn LoadedModule, run: &RunContext) -> Result<()> {
    for declaration in module.declarations() {
        match declaration {
            Declaration::Repos(repos) => {
                if repos.is_empty() {
                    return Err(BuilddagError::MissingDirectiveTarget("repos".to_string()));
                }
                for repo in repos {
                    run.plugins.add_repository(&repo)?;
                }
            }
            Declaration::Plugins(plugins) => {
                if plugins.is_empty() {
                    return Err(BuilddagError::MissingDirectiveTarget("plugins".to_string()));
                }
                for plugin in plugins {
                    run.plugins.register(&plugin)?;
                }
            }
        }
    }
    Ok(())
}

fn introspect(module: &dyn LoadedModule, harvest: &mut Harvest, run: &RunContext) -> Result<()> {
    let members = module.members().map_err(|source| BuilddagError::ModuleLoad {
        module: module.name().to_string(),
        source,
    })?;

    for member in members {
        match &member {
            m if m.is_project_accessor() => {
                let value = module
                    .invoke(m.name())
                    .map_err(|source| BuilddagError::MemberInvoke {
                        module: module.name().to_string(),
                        member: m.name().to_string(),
                        source,
                    })?;
                match value {
                    MemberValue::Project(project) => {
                        debug!(module = %module.name(), project = %project.name, "harvested project");
                        harvest.projects.push(project);
                    }
                    MemberValue::Other(kind) => {
                        return Err(BuilddagError::MemberInvoke {
                            module: module.name().to_string(),
                            member: m.name().to_string(),
                            source: anyhow::anyhow!("expected a project, got {kind}"),
                        });
                    }
                }
            }
            Member::Method {
                name,
                marker: Some(marker),
                ..
            } => {
                let task = TaskEntryPoint {
                    module: module.name().to_string(),
                    method: name.clone(),
                    marker: marker.clone(),
                };
                run.tasks.register(task.clone());
                harvest.tasks.push(task);
            }
            _ => {}
        }
    }
    Ok(())
}

fn merge_unique(accumulated: &mut Vec<ProjectNode>, harvested: &[ProjectNode]) -> Result<()> {
    let mut seen: HashSet<&str> = accumulated.iter().map(|p| p.name.as_str()).collect();
    for project in harvested {
        if !seen.insert(project.name.as_str()) {
            return Err(BuilddagError::DuplicateProject(project.name.clone()));
        }
    }
    accumulated.extend(harvested.iter().cloned());
    Ok(())
}
