// src/engine/pipeline.rs

//! Per-run orchestration.
//!
//! For every script, in order:
//! 1. check the cache directory's version stamp (wiping it on mismatch) and
//!    make sure the directory exists;
//! 2. extract the plugin/repository directives;
//! 3. if there are any, compile and load the bootstrap artifact, which
//!    registers plugins, then resolve the new plugins;
//! 4. compile the full script unless the cached artifact is fresh;
//! 5. load the artifact and harvest projects and tasks.
//!
//! After the last script the harvested projects are assembled into one
//! ordered set and published. A failure anywhere aborts the run and
//! publishes nothing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::compile::{compile_checked, CompileRequest, ScriptCompiler};
use crate::dag::{assemble, OrderedProjectSet, ProjectNode};
use crate::engine::context::RunContext;
use crate::engine::notifier::ChangeNotifier;
use crate::errors::{BuilddagError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::load::{ArchiveRuntime, ArtifactLoader};
use crate::plugins::{
    ClasspathInstaller, DependencyResolver, ProjectContributor, TaskEntryPoint,
};
use crate::script::directives::extract_from_source;
use crate::script::{CacheGuard, CacheLayout, ExtractedDirectives, ScriptSource, VersionCheck};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root below which per-script cache directories live.
    pub cache_root: PathBuf,
    /// Written to and compared against each cache directory's stamp.
    pub engine_version: String,
    /// Engine artifacts appended to every main-script classpath.
    pub engine_classpath: Vec<PathBuf>,
    pub compile_timeout: Option<Duration>,
}

impl PipelineOptions {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            engine_classpath: Vec::new(),
            compile_timeout: None,
        }
    }
}

/// What happened to a single script during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub script: String,
    pub version_check: VersionCheck,
    pub bootstrap_compiled: bool,
    pub compiled: bool,
    pub projects: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub projects: Arc<OrderedProjectSet>,
    pub tasks: Vec<TaskEntryPoint>,
    /// Declared plugin coordinates, in registration order.
    pub plugins: Vec<String>,
    pub scripts: Vec<ScriptReport>,
}

pub struct Pipeline {
    fs: Arc<dyn FileSystem>,
    guard: CacheGuard,
    compiler: Arc<dyn ScriptCompiler>,
    loader: ArtifactLoader,
    resolver: Arc<dyn DependencyResolver>,
    contributors: Vec<Arc<dyn ProjectContributor>>,
    notifier: ChangeNotifier,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        compiler: Arc<dyn ScriptCompiler>,
        resolver: Arc<dyn DependencyResolver>,
    ) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Self {
            guard: CacheGuard::new(Arc::clone(&fs), options.engine_version.clone()),
            fs,
            compiler,
            loader: ArtifactLoader::new(Arc::new(ArchiveRuntime), Arc::new(ClasspathInstaller)),
            resolver,
            contributors: Vec::new(),
            notifier: ChangeNotifier::default(),
            options,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.guard = CacheGuard::new(Arc::clone(&fs), self.options.engine_version.clone());
        self.fs = fs;
        self
    }

    pub fn with_loader(mut self, loader: ArtifactLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_contributor(mut self, contributor: Arc<dyn ProjectContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process every script and publish the resulting project order.
    pub async fn run(&self, sources: &[ScriptSource]) -> Result<RunOutcome> {
        let run = RunContext::new();
        let mut harvested: Vec<ProjectNode> = Vec::new();
        let mut scripts = Vec::with_capacity(sources.len());

        info!(scripts = sources.len(), "pipeline run started");
        for source in sources {
            scripts.push(self.process_script(source, &run, &mut harvested).await?);
        }

        let projects = Arc::new(assemble(harvested, &self.contributors)?);
        self.notifier.publish(Arc::clone(&projects));
        info!(projects = projects.len(), "pipeline run finished");

        Ok(RunOutcome {
            projects,
            tasks: run.tasks.snapshot(),
            plugins: run.plugins.snapshot().iter().map(|p| p.id().to_string()).collect(),
            scripts,
        })
    }

    #[instrument(skip_all, fields(script = %source.name()))]
    async fn process_script(
        &self,
        source: &ScriptSource,
        run: &RunContext,
        harvested: &mut Vec<ProjectNode>,
    ) -> Result<ScriptReport> {
        let layout = CacheLayout::for_script(&self.options.cache_root, source);
        let version_check = self.guard.check_version(&layout)?;
        self.guard.prepare(&layout)?;

        let directives = extract_from_source(self.fs.as_ref(), source)?;
        directives.validate()?;

        let (bootstrap_compiled, plugin_classpath) = if directives.is_empty() {
            debug!("no plugin or repository directives; skipping bootstrap");
            (false, Vec::new())
        } else {
            self.bootstrap(source, &layout, &directives, run).await?
        };

        let artifact = layout.main_artifact();
        let compiled = if self.guard.is_fresh(source, &artifact) {
            debug!(artifact = ?artifact, "compiled script is up to date");
            false
        } else {
            let mut classpath = plugin_classpath.clone();
            classpath.extend(self.options.engine_classpath.iter().cloned());
            let request = CompileRequest::new(source.path(), source.path(), &artifact)
                .with_classpath(classpath);
            self.compile(&request).await?;
            self.guard.write_stamp(&layout)?;
            true
        };

        let mut classpath = plugin_classpath;
        classpath.extend(self.options.engine_classpath.iter().cloned());
        let before = harvested.len();
        self.loader.load(&artifact, &classpath, run, harvested)?;

        Ok(ScriptReport {
            script: source.name().to_string(),
            version_check,
            bootstrap_compiled,
            compiled,
            projects: harvested[before..].iter().map(|p| p.name.clone()).collect(),
        })
    }

    /// Compile and load the directive-only artifact, then resolve any plugin
    /// it registered. Returns whether a compile happened and the resolved
    /// plugin locations for the main classpath.
    async fn bootstrap(
        &self,
        source: &ScriptSource,
        layout: &CacheLayout,
        directives: &ExtractedDirectives,
        run: &RunContext,
    ) -> Result<(bool, Vec<PathBuf>)> {
        let artifact = layout.bootstrap_artifact();

        let compiled = if self.guard.is_fresh(source, &artifact) {
            debug!(artifact = ?artifact, "bootstrap artifact is up to date");
            false
        } else {
            let temp = write_bootstrap_source(source, directives)?;
            let request = CompileRequest::new(source.path(), temp.path(), &artifact);
            self.compile(&request).await?;
            self.guard.write_stamp(layout)?;
            true
        };

        let already_known = run.plugins.len();
        let mut scratch = Vec::new();
        self.loader.load(&artifact, &[], run, &mut scratch)?;

        let plugins = run.plugins.snapshot();
        let repositories = run.plugins.repositories();
        for plugin in &plugins[already_known..] {
            plugin.resolve(self.resolver.as_ref(), &repositories)?;
        }

        let locations = plugins
            .iter()
            .filter_map(|p| p.location().map(Path::to_path_buf))
            .collect();
        Ok((compiled, locations))
    }

    async fn compile(&self, request: &CompileRequest) -> Result<()> {
        match self.options.compile_timeout {
            None => compile_checked(self.compiler.as_ref(), request).await,
            Some(limit) => tokio::time::timeout(limit, compile_checked(self.compiler.as_ref(), request))
                .await
                .map_err(|_| {
                    BuilddagError::compilation(
                        &request.script,
                        format!("compilation timed out after {}s", limit.as_secs()),
                    )
                })?,
        }
    }
}

fn write_bootstrap_source(
    source: &ScriptSource,
    directives: &ExtractedDirectives,
) -> Result<tempfile::NamedTempFile> {
    let suffix = source
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("preBuildScript")
        .suffix(&suffix)
        .tempfile()
        .context("creating bootstrap source file")?;
    file.write_all(directives.bootstrap_source().as_bytes())
        .context("writing bootstrap source file")?;
    file.flush().context("flushing bootstrap source file")?;
    Ok(file)
}
