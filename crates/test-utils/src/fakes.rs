#![allow(dead_code)]

//! In-process stand-ins for the compiler, resolver and contributors.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use builddag::compile::{CompileRequest, ScriptCompiler};
use builddag::errors::{BuilddagError, Result};
use builddag::plugins::{ContributedProject, DependencyResolver, ProjectContributor};

use crate::builders::ArtifactBuilder;

#[derive(Debug, Default)]
struct CompilerState {
    main: HashMap<PathBuf, ArtifactBuilder>,
    bootstrap: HashMap<PathBuf, ArtifactBuilder>,
    failing: HashMap<PathBuf, String>,
    calls: Vec<CompileRequest>,
}

/// Writes preconfigured archives instead of running a toolchain.
///
/// A request whose `source` is the script itself is a main compile; any
/// other source is the generated bootstrap file. Scripts without a
/// configured archive get an empty one. Like a real toolchain, it never
/// creates the output directory.
#[derive(Debug, Clone, Default)]
pub struct FakeCompiler {
    state: Arc<Mutex<CompilerState>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main(self, script: impl AsRef<Path>, artifact: ArtifactBuilder) -> Self {
        self.set_main(script, artifact);
        self
    }

    pub fn with_bootstrap(self, script: impl AsRef<Path>, artifact: ArtifactBuilder) -> Self {
        self.state
            .lock()
            .unwrap()
            .bootstrap
            .insert(script.as_ref().to_path_buf(), artifact);
        self
    }

    /// Replace the main archive for `script`, e.g. after editing it.
    pub fn set_main(&self, script: impl AsRef<Path>, artifact: ArtifactBuilder) {
        self.state
            .lock()
            .unwrap()
            .main
            .insert(script.as_ref().to_path_buf(), artifact);
    }

    pub fn fail_for(&self, script: impl AsRef<Path>, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(script.as_ref().to_path_buf(), message.to_string());
    }

    pub fn calls(&self) -> Vec<CompileRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn main_compiles(&self) -> usize {
        self.calls().iter().filter(|r| r.source == r.script).count()
    }

    pub fn bootstrap_compiles(&self) -> usize {
        self.calls().iter().filter(|r| r.source != r.script).count()
    }

    fn compile_now(&self, request: &CompileRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        if let Some(message) = state.failing.get(&request.script) {
            return Err(BuilddagError::compilation(&request.script, message));
        }

        let table = if request.source == request.script {
            &state.main
        } else {
            &state.bootstrap
        };
        if !request.output.parent().is_some_and(Path::is_dir) {
            return Err(BuilddagError::compilation(
                &request.script,
                format!("output directory of {} does not exist", request.output.display()),
            ));
        }

        let artifact = table.get(&request.script).cloned().unwrap_or_default();
        artifact
            .write_to(&request.output)
            .map_err(|e| BuilddagError::compilation(&request.script, e))
    }
}

impl ScriptCompiler for FakeCompiler {
    fn compile<'a>(
        &'a self,
        request: &'a CompileRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let result = self.compile_now(request);
        Box::pin(async move { result })
    }
}

/// Resolves every coordinate to `<root>/<coordinate>.jar` and records calls.
#[derive(Debug, Clone)]
pub struct FakeResolver {
    root: PathBuf,
    calls: Arc<Mutex<Vec<String>>>,
    failing: Option<String>,
}

impl FakeResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: None,
        }
    }

    /// Every resolution fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failing: Some(message.to_string()),
            ..Self::new("/nowhere")
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn location_of(&self, coordinate: &str) -> PathBuf {
        self.root.join(format!("{}.jar", coordinate.replace(':', "-")))
    }
}

impl DependencyResolver for FakeResolver {
    fn resolve(&self, coordinate: &str, _repositories: &[String]) -> anyhow::Result<PathBuf> {
        self.calls.lock().unwrap().push(coordinate.to_string());
        match &self.failing {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.location_of(coordinate)),
        }
    }
}

/// Contributor returning a fixed list and counting how often it was asked.
#[derive(Debug, Default)]
pub struct StaticContributor {
    projects: Vec<ContributedProject>,
    calls: Mutex<usize>,
}

impl StaticContributor {
    pub fn new(projects: Vec<ContributedProject>) -> Arc<Self> {
        Arc::new(Self {
            projects,
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ProjectContributor for StaticContributor {
    fn contributed_projects(&self) -> Vec<ContributedProject> {
        *self.calls.lock().unwrap() += 1;
        self.projects.clone()
    }
}
