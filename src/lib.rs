// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod load;
pub mod logging;
pub mod plugins;
pub mod script;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::compile::ProcessCompiler;
use crate::config::{load_or_default, ConfigFile};
use crate::dag::OrderedProjectSet;
use crate::engine::{ChangeNotifier, Pipeline, PipelineOptions};
use crate::exec::TestRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::plugins::LocalRepositoryResolver;
use crate::script::directives::extract_from_source;
use crate::script::{discover_scripts, ScriptPatterns, ScriptSource};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - script discovery
/// - the compile/load pipeline and its notifier
/// - (optional) file watcher and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let root = config_root_dir(&config_path);
    let cache_root = cfg.cache_root(&root);
    let patterns = ScriptPatterns::new(&cfg.scripts.include, &cfg.scripts.exclude)?;

    let scripts = script_paths(&args, &root, &patterns, &cache_root)?;
    info!(count = scripts.len(), root = ?root, "build scripts selected");

    if args.dry_run {
        print_dry_run(&root, &scripts)?;
        return Ok(());
    }

    let pipeline = Arc::new(build_pipeline(&cfg, &args, cache_root.clone()));

    if !args.watch {
        let sources = load_sources(&root, &scripts)?;
        let outcome = pipeline.run(&sources).await?;
        print_projects(&outcome.projects);
        return Ok(());
    }

    run_watch(args, root, cache_root, patterns, pipeline).await
}

/// Test runner configured from `[test]`, if a main class is set.
pub fn test_runner(cfg: &ConfigFile) -> Option<TestRunner> {
    cfg.test
        .main_class
        .as_ref()
        .map(|main| TestRunner::new(cfg.test.program.clone(), main.clone()))
}

fn build_pipeline(cfg: &ConfigFile, args: &CliArgs, cache_root: PathBuf) -> Pipeline {
    let mut options = PipelineOptions::new(cache_root);
    options.engine_version = cfg.engine_version();
    options.engine_classpath = cfg.engine.classpath.clone();
    options.compile_timeout = args
        .compile_timeout
        .map(Duration::from_secs)
        .or_else(|| cfg.compile_timeout());

    let compiler = ProcessCompiler::new(cfg.compiler.program.clone(), cfg.compiler.args.clone());
    let resolver = LocalRepositoryResolver::new(cfg.resolver.local_repositories.clone());

    Pipeline::new(options, Arc::new(compiler), Arc::new(resolver))
        .with_notifier(ChangeNotifier::new(cfg.notifier.capacity))
}

async fn run_watch(
    args: CliArgs,
    root: PathBuf,
    cache_root: PathBuf,
    patterns: ScriptPatterns,
    pipeline: Arc<Pipeline>,
) -> Result<()> {
    // Every published result is printed, whichever run produced it.
    let mut results = pipeline.notifier().subscribe();
    tokio::spawn(async move {
        while let Ok(projects) = results.recv().await {
            print_projects(&projects);
        }
    });

    run_logged(&pipeline, &root, &script_paths(&args, &root, &patterns, &cache_root)?).await;

    let (change_tx, change_rx) = mpsc::channel(64);
    let _watcher = watch::spawn_watcher(root.clone(), patterns.clone(), cache_root.clone(), change_tx)?;

    let rerun = watch::rerun_on_change(change_rx, |changed| {
        let pipeline = Arc::clone(&pipeline);
        let root = root.clone();
        let scripts = script_paths(&args, &root, &patterns, &cache_root);
        async move {
            debug!(?changed, "scripts changed");
            match scripts {
                Ok(scripts) => run_logged(&pipeline, &root, &scripts).await,
                Err(e) => error!(error = %e, "script discovery failed"),
            }
        }
    });

    tokio::select! {
        _ = rerun => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
            info!("shutdown requested");
        }
    }

    Ok(())
}

/// One watch-mode run: failures are reported, never fatal.
async fn run_logged(pipeline: &Pipeline, root: &Path, scripts: &[PathBuf]) {
    let sources = match load_sources(root, scripts) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot read build scripts");
            return;
        }
    };
    match pipeline.run(&sources).await {
        Ok(_) => {}
        Err(e) if e.is_validation() => {
            warn!(error = %e, "build scripts are invalid; waiting for the next change");
        }
        Err(e) => error!(error = %e, "pipeline run failed"),
    }
}

fn script_paths(
    args: &CliArgs,
    root: &Path,
    patterns: &ScriptPatterns,
    cache_root: &Path,
) -> Result<Vec<PathBuf>> {
    if args.scripts.is_empty() {
        discover_scripts(root, patterns, cache_root)
    } else {
        Ok(args.scripts.clone())
    }
}

fn load_sources(root: &Path, scripts: &[PathBuf]) -> Result<Vec<ScriptSource>> {
    let fs = RealFileSystem;
    let root = fs.canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    scripts
        .iter()
        .map(|path| {
            // Cache directories are keyed on the canonical path.
            let path = fs.canonicalize(path)?;
            ScriptSource::from_path(&fs, &root, &path)
        })
        .collect()
}

/// Figure out the project root.
///
/// The config file's directory, or the current working directory when the
/// config path is a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_projects(projects: &OrderedProjectSet) {
    println!("build order ({} projects):", projects.len());
    for (i, project) in projects.iter().enumerate() {
        println!("  {:>3}. {} ({})", i + 1, project.name, project.directory.display());
    }
}

fn print_dry_run(root: &Path, scripts: &[PathBuf]) -> Result<()> {
    println!("builddag dry-run");
    println!("  root = {}", root.display());
    println!();
    println!("scripts ({}):", scripts.len());

    let fs = RealFileSystem;
    for source in load_sources(root, scripts)? {
        println!("  - {}", source.name());
        let directives = extract_from_source(&fs, &source)?;
        for call in directives.calls() {
            println!("      {}({})", call.kind, call.argument_list());
        }
    }

    debug!("dry-run complete (nothing compiled)");
    Ok(())
}
