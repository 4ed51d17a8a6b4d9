// src/load/archive.rs

//! Default module runtime backed by compiled archives.
//!
//! Each compiled module is stored in the artifact as a `*.mod` entry whose
//! path mirrors its dotted name (`build/Projects.mod` is `build.Projects`).
//! The entry is a TOML document describing what the module declares:
//!
//! ```toml
//! plugins = ["org.example:lint:1.0"]
//! repos = ["https://repo.example.com/maven"]
//!
//! [[accessor]]
//! name = "core"
//! project = { name = "core", directory = "core" }
//!
//! [[method]]
//! name = "deploy"
//! task = { description = "Ship it", runs_after = ["build"] }
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::trace;

use crate::dag::ProjectNode;
use crate::load::runtime::{
    Declaration, LoadContext, LoadedModule, Member, MemberValue, ModuleRuntime, ReturnKind,
};
use crate::plugins::TaskMarker;

/// Extension of module entries inside an archive.
pub const MODULE_EXTENSION: &str = "mod";

/// Synthetic module the compiler emits for the script body itself.
pub const SCRIPT_MODULE: &str = "Build";

/// List every module contained in `artifact`, in archive order.
pub fn list_modules(artifact: &Path) -> Result<Vec<String>> {
    let file = File::open(artifact).with_context(|| format!("opening artifact {:?}", artifact))?;
    let archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("reading archive {:?}", artifact))?;

    Ok(archive.file_names().filter_map(entry_to_module).collect())
}

fn entry_to_module(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(&format!(".{MODULE_EXTENSION}"))?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some(stem.replace('/', "."))
}

fn module_to_entry(module: &str) -> String {
    format!("{}.{MODULE_EXTENSION}", module.replace('.', "/"))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleDescriptor {
    #[serde(default)]
    plugins: Vec<String>,
    #[serde(default)]
    repos: Vec<String>,
    #[serde(default, rename = "accessor")]
    accessors: Vec<AccessorDescriptor>,
    #[serde(default, rename = "method")]
    methods: Vec<MethodDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccessorDescriptor {
    name: String,
    #[serde(default)]
    parameters: usize,
    #[serde(default = "default_true")]
    module_level: bool,
    /// Value produced when the accessor returns a project.
    #[serde(default)]
    project: Option<ProjectNode>,
    /// Declared return type when it is not a project.
    #[serde(default)]
    returns: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDescriptor {
    name: String,
    #[serde(default)]
    parameters: usize,
    #[serde(default)]
    task: Option<TaskMarker>,
}

#[derive(Debug)]
struct ArchiveModule {
    name: String,
    descriptor: ModuleDescriptor,
}

impl LoadedModule for ArchiveModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declarations(&self) -> Vec<Declaration> {
        let mut out = Vec::new();
        if !self.descriptor.repos.is_empty() {
            out.push(Declaration::Repos(self.descriptor.repos.clone()));
        }
        if !self.descriptor.plugins.is_empty() {
            out.push(Declaration::Plugins(self.descriptor.plugins.clone()));
        }
        out
    }

    fn members(&self) -> Result<Vec<Member>> {
        let accessors = self.descriptor.accessors.iter().map(|a| {
            let returns = match (&a.project, &a.returns) {
                (Some(_), _) => ReturnKind::Project,
                (None, Some(other)) => ReturnKind::Other(other.clone()),
                (None, None) => ReturnKind::Other("Unit".to_string()),
            };
            Member::Accessor {
                name: a.name.clone(),
                parameters: a.parameters,
                module_level: a.module_level,
                returns,
            }
        });
        let methods = self.descriptor.methods.iter().map(|m| Member::Method {
            name: m.name.clone(),
            parameters: m.parameters,
            marker: m.task.clone(),
        });
        Ok(accessors.chain(methods).collect())
    }

    fn invoke(&self, accessor: &str) -> Result<MemberValue> {
        let found = self
            .descriptor
            .accessors
            .iter()
            .find(|a| a.name == accessor)
            .ok_or_else(|| anyhow!("module '{}' has no accessor '{}'", self.name, accessor))?;

        Ok(match (&found.project, &found.returns) {
            (Some(project), _) => MemberValue::Project(project.clone()),
            (None, Some(other)) => MemberValue::Other(other.clone()),
            (None, None) => MemberValue::Other("Unit".to_string()),
        })
    }
}

/// Load scope over an artifact and the locations added to it.
///
/// Modules are looked up in the artifact first, then in each location in
/// order. Locations may be archives or plain directories.
#[derive(Debug)]
pub struct ArchiveContext {
    artifact: PathBuf,
    locations: Vec<PathBuf>,
}

impl ArchiveContext {
    pub fn new(artifact: impl Into<PathBuf>, locations: Vec<PathBuf>) -> Self {
        Self {
            artifact: artifact.into(),
            locations,
        }
    }

    fn read_entry(location: &Path, entry: &str) -> Result<Option<String>> {
        if location.is_dir() {
            let path = location.join(entry);
            if !path.is_file() {
                return Ok(None);
            }
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            return Ok(Some(text));
        }
        if !location.is_file() {
            return Ok(None);
        }

        let file = File::open(location).with_context(|| format!("opening {:?}", location))?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("reading archive {:?}", location))?;
        let mut zipped = match archive.by_name(entry) {
            Ok(f) => f,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {entry} from {:?}", location)),
        };
        let mut text = String::new();
        zipped
            .read_to_string(&mut text)
            .with_context(|| format!("reading {entry} from {:?}", location))?;
        Ok(Some(text))
    }
}

impl LoadContext for ArchiveContext {
    fn artifact(&self) -> &Path {
        &self.artifact
    }

    fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    fn add_location(&mut self, location: PathBuf) {
        self.locations.push(location);
    }

    fn load_module(&mut self, name: &str) -> Result<Option<Box<dyn LoadedModule>>> {
        let entry = module_to_entry(name);
        let search = std::iter::once(&self.artifact).chain(self.locations.iter());

        for location in search {
            if let Some(text) = Self::read_entry(location, &entry)? {
                trace!(module = %name, location = ?location, "module found");
                let descriptor: ModuleDescriptor = toml::from_str(&text)
                    .with_context(|| format!("decoding module metadata {entry}"))?;
                return Ok(Some(Box::new(ArchiveModule {
                    name: name.to_string(),
                    descriptor,
                })));
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveRuntime;

impl ModuleRuntime for ArchiveRuntime {
    fn create_context(&self, artifact: &Path, classpath: &[PathBuf]) -> Result<Box<dyn LoadContext>> {
        if !artifact.is_file() {
            return Err(anyhow!("artifact {:?} does not exist", artifact));
        }
        Ok(Box::new(ArchiveContext::new(artifact, classpath.to_vec())))
    }
}
