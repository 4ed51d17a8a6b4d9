// tests/pipeline.rs

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use builddag::compile::{compile_checked, CompileRequest, ProcessCompiler};
use builddag::engine::{Pipeline, PipelineOptions};
use builddag::errors::BuilddagError;
use builddag::plugins::ContributedProject;
use builddag::script::cache::{CacheLayout, VERSION_FILE};
use builddag::script::VersionCheck;
use builddag::dag::ProjectNode;
use builddag_test_utils::builders::{project, ArtifactBuilder, ModuleBuilder};
use builddag_test_utils::fakes::{FakeCompiler, FakeResolver, StaticContributor};
use builddag_test_utils::{init_tracing, pipeline, sources, touch_forward, write_script};

const PLAIN_SCRIPT: &str = "val core = project { name = \"core\" }\n";

fn core_artifact() -> ArtifactBuilder {
    ArtifactBuilder::new()
        .entry("Build.mod", "")
        .module(ModuleBuilder::new("build.Projects").project(&project("core")))
}

#[tokio::test]
async fn single_script_harvests_its_project() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);

    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let outcome = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    assert_eq!(outcome.projects.names(), vec!["core"]);
    assert_eq!(outcome.scripts.len(), 1);
    assert!(outcome.scripts[0].compiled);
    assert!(!outcome.scripts[0].bootstrap_compiled);
    assert_eq!(compiler.bootstrap_compiles(), 0);
    assert!(outcome.plugins.is_empty());
}

#[tokio::test]
async fn fresh_artifact_is_not_recompiled() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);

    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    pipeline.run(&sources(dir.path(), &[script.clone()])).await.unwrap();
    let second = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    assert_eq!(compiler.main_compiles(), 1);
    assert!(!second.scripts[0].compiled);
    assert_eq!(second.scripts[0].version_check, VersionCheck::Matches);
    assert_eq!(second.projects.names(), vec!["core"]);
}

#[tokio::test]
async fn edited_script_is_recompiled() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);

    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    pipeline.run(&sources(dir.path(), &[script.clone()])).await.unwrap();

    touch_forward(&script, 120);
    compiler.set_main(
        &script,
        ArtifactBuilder::new().module(
            ModuleBuilder::new("build.Projects")
                .project(&project("core"))
                .project(&project("api").with_dependencies(["core"])),
        ),
    );
    let second = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    assert_eq!(compiler.main_compiles(), 2);
    assert!(second.scripts[0].compiled);
    assert_eq!(second.projects.names(), vec!["core", "api"]);
}

#[tokio::test]
async fn engine_version_change_wipes_cache_before_compiling() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));

    pipeline(dir.path(), &compiler, &resolver)
        .run(&sources(dir.path(), &[script.clone()]))
        .await
        .unwrap();

    let srcs = sources(dir.path(), &[script]);
    let layout = CacheLayout::for_script(&dir.path().join(".builddag"), &srcs[0]);
    let leftover = layout.dir().join("leftover.class");
    std::fs::write(&leftover, b"stale").unwrap();
    assert_eq!(std::fs::read_to_string(layout.dir().join(VERSION_FILE)).unwrap(), "test-1");

    let mut options = PipelineOptions::new(dir.path().join(".builddag"));
    options.engine_version = "test-2".to_string();
    let upgraded = Pipeline::new(options, Arc::new(compiler.clone()), Arc::new(resolver.clone()));
    let outcome = upgraded.run(&srcs).await.unwrap();

    // buildScript.jar, version.txt and the leftover file.
    assert_eq!(outcome.scripts[0].version_check, VersionCheck::Wiped(3));
    assert!(outcome.scripts[0].compiled);
    assert!(!leftover.exists());
    assert_eq!(compiler.main_compiles(), 2);
    assert_eq!(std::fs::read_to_string(layout.dir().join(VERSION_FILE)).unwrap(), "test-2");
}

#[tokio::test]
async fn plugin_directives_are_bootstrapped_and_resolved() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "app/Build.kts",
        "repos(\"file:///opt/repo\")\nplugins(\"org.example:lint:1.0\")\nval app = project { }\n",
    );

    let compiler = FakeCompiler::new()
        .with_bootstrap(
            &script,
            ArtifactBuilder::new().module(
                ModuleBuilder::new("Prelude")
                    .repo("file:///opt/repo")
                    .plugin("org.example:lint:1.0"),
            ),
        )
        .with_main(
            &script,
            ArtifactBuilder::new().module(ModuleBuilder::new("app.Projects").project(&project("app"))),
        );
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let outcome = pipeline.run(&sources(dir.path(), &[script.clone()])).await.unwrap();

    assert!(outcome.scripts[0].bootstrap_compiled);
    assert_eq!(outcome.plugins, vec!["org.example:lint:1.0"]);
    assert_eq!(resolver.calls(), vec!["org.example:lint:1.0"]);

    let calls = compiler.calls();
    assert_eq!(calls.len(), 2);
    let bootstrap = &calls[0];
    assert_ne!(bootstrap.source, script);
    assert!(bootstrap.classpath.is_empty());
    assert!(bootstrap.output.ends_with("preBuildScript.jar"));

    let main = &calls[1];
    assert_eq!(main.source, script);
    assert_eq!(main.classpath, vec![resolver.location_of("org.example:lint:1.0")]);
    assert!(main.output.ends_with("buildScript.jar"));
    assert_eq!(outcome.projects.names(), vec!["app"]);
}

#[tokio::test]
async fn resolver_failure_is_passed_through() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", "plugins(\"g:a:1\")\n");
    let compiler = FakeCompiler::new().with_bootstrap(
        &script,
        ArtifactBuilder::new().module(ModuleBuilder::new("Prelude").plugin("g:a:1")),
    );
    let resolver = FakeResolver::failing("artifact g:a:1 not found in any repository");
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    match pipeline.run(&sources(dir.path(), &[script])).await {
        Err(BuilddagError::Resolution(e)) => {
            assert_eq!(e.to_string(), "artifact g:a:1 not found in any repository");
        }
        other => panic!("expected Resolution error, got {other:?}"),
    }
    assert_eq!(compiler.main_compiles(), 0);
}

#[tokio::test]
async fn empty_directive_is_rejected_before_compiling() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", "plugins()\n");
    let compiler = FakeCompiler::new();
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let err = pipeline.run(&sources(dir.path(), &[script])).await.unwrap_err();

    assert!(matches!(err, BuilddagError::MissingDirectiveTarget(ref d) if d == "plugins"));
    assert!(compiler.calls().is_empty());
}

#[tokio::test]
async fn projects_from_different_scripts_are_ordered_together() {
    let dir = TempDir::new().unwrap();
    let app = write_script(dir.path(), "app/Build.kts", PLAIN_SCRIPT);
    let lib = write_script(dir.path(), "lib/Build.kts", PLAIN_SCRIPT);

    let compiler = FakeCompiler::new()
        .with_main(
            &app,
            ArtifactBuilder::new().module(
                ModuleBuilder::new("app.Projects").project(&project("app").with_dependencies(["lib"])),
            ),
        )
        .with_main(
            &lib,
            ArtifactBuilder::new().module(ModuleBuilder::new("lib.Projects").project(&project("lib"))),
        );
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let outcome = pipeline.run(&sources(dir.path(), &[app, lib])).await.unwrap();

    assert_eq!(outcome.projects.names(), vec!["lib", "app"]);
    assert_eq!(outcome.scripts[0].projects, vec!["app"]);
    assert_eq!(outcome.scripts[1].projects, vec!["lib"]);
}

#[tokio::test]
async fn duplicate_project_across_scripts_is_fatal() {
    let dir = TempDir::new().unwrap();
    let a = write_script(dir.path(), "a/Build.kts", PLAIN_SCRIPT);
    let b = write_script(dir.path(), "b/Build.kts", PLAIN_SCRIPT);

    let compiler = FakeCompiler::new()
        .with_main(&a, core_artifact())
        .with_main(&b, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);
    let mut rx = pipeline.notifier().subscribe();

    let err = pipeline.run(&sources(dir.path(), &[a, b])).await.unwrap_err();

    assert!(matches!(err, BuilddagError::DuplicateProject(ref n) if n == "core"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn contributed_projects_join_the_graph() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));

    let contributor = StaticContributor::new(vec![ContributedProject::new(
        project("docs"),
        vec![project("core"), ProjectNode::new("site-theme", "vendor/theme")],
    )]);
    let pipeline = pipeline(dir.path(), &compiler, &resolver).with_contributor(contributor.clone());

    let outcome = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();
    let order = &outcome.projects;

    assert_eq!(order.len(), 3);
    assert!(order.position("core").unwrap() < order.position("docs").unwrap());
    assert!(order.position("site-theme").unwrap() < order.position("docs").unwrap());
    assert_eq!(contributor.calls(), 1);
}

#[tokio::test]
async fn contributed_name_clash_is_fatal() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new().with_main(&script, core_artifact());
    let resolver = FakeResolver::new(dir.path().join("repo"));

    let contributor = StaticContributor::new(vec![ContributedProject::new(
        ProjectNode::new("core", "plugins/core"),
        Vec::new(),
    )]);
    let pipeline = pipeline(dir.path(), &compiler, &resolver).with_contributor(contributor);

    let err = pipeline.run(&sources(dir.path(), &[script])).await.unwrap_err();
    assert!(matches!(err, BuilddagError::DuplicateProject(ref n) if n == "core"));
}

#[tokio::test]
async fn compiler_failure_names_the_script() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new();
    compiler.fail_for(&script, "unresolved reference: projct");
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    match pipeline.run(&sources(dir.path(), &[script.clone()])).await {
        Err(BuilddagError::CompilationFailed { script: failed, message }) => {
            assert_eq!(failed, script);
            assert!(message.contains("projct"));
        }
        other => panic!("expected CompilationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn task_entry_points_are_collected() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new().with_main(
        &script,
        ArtifactBuilder::new().module(
            ModuleBuilder::new("build.Tasks")
                .task("deploy", "Ship the release")
                .method("helper"),
        ),
    );
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let outcome = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    assert_eq!(outcome.tasks.len(), 1);
    assert_eq!(outcome.tasks[0].task_name(), "deploy");
    assert_eq!(outcome.tasks[0].marker.description, "Ship the release");
    assert!(outcome.projects.is_empty());
}

#[tokio::test]
async fn cache_directories_are_per_script() {
    let dir = TempDir::new().unwrap();
    let a = write_script(dir.path(), "a/Build.kts", PLAIN_SCRIPT);
    let b = write_script(dir.path(), "b/Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new();
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    pipeline.run(&sources(dir.path(), &[a, b])).await.unwrap();

    let outputs: Vec<PathBuf> = compiler.calls().into_iter().map(|c| c.output).collect();
    assert_eq!(outputs.len(), 2);
    assert_ne!(outputs[0].parent(), outputs[1].parent());
    assert!(outputs.iter().all(|o| o.starts_with(dir.path().join(".builddag/scripts"))));
}

#[cfg(unix)]
#[tokio::test]
async fn process_compiler_writes_into_a_clean_cache_root() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let template = dir.path().join("compiled.zip");
    core_artifact().write_to(&template).unwrap();
    assert!(!dir.path().join(".builddag").exists());

    // `cp` never creates the destination directory.
    let compiler = ProcessCompiler::new(
        "sh",
        vec![
            "-c".to_string(),
            "cp \"$1\" \"$0\"".to_string(),
            "{output}".to_string(),
            template.display().to_string(),
        ],
    );
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = Pipeline::new(
        PipelineOptions::new(dir.path().join(".builddag")),
        Arc::new(compiler),
        Arc::new(resolver),
    );

    let outcome = pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    assert_eq!(outcome.projects.names(), vec!["core"]);
    assert!(outcome.scripts[0].compiled);
}

#[tokio::test]
async fn fake_compiler_rejects_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", PLAIN_SCRIPT);
    let compiler = FakeCompiler::new();
    let request = CompileRequest::new(&script, &script, dir.path().join("nowhere/buildScript.jar"));

    match compile_checked(&compiler, &request).await {
        Err(BuilddagError::CompilationFailed { message, .. }) => {
            assert!(message.contains("does not exist"));
        }
        other => panic!("expected CompilationFailed, got {other:?}"),
    }
}
