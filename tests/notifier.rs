// tests/notifier.rs

use tempfile::TempDir;

use builddag_test_utils::builders::{project, ArtifactBuilder, ModuleBuilder};
use builddag_test_utils::fakes::{FakeCompiler, FakeResolver};
use builddag_test_utils::{init_tracing, pipeline, sources, touch_forward, with_timeout, write_script};

#[tokio::test]
async fn two_successful_runs_publish_twice_in_order() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", "val core = project { }\n");

    let compiler = FakeCompiler::new().with_main(
        &script,
        ArtifactBuilder::new().module(ModuleBuilder::new("P").project(&project("core"))),
    );
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let mut first_sub = pipeline.notifier().subscribe();
    let mut second_sub = pipeline.notifier().subscribe();

    pipeline.run(&sources(dir.path(), &[script.clone()])).await.unwrap();

    touch_forward(&script, 120);
    compiler.set_main(
        &script,
        ArtifactBuilder::new().module(
            ModuleBuilder::new("P")
                .project(&project("core"))
                .project(&project("cli").with_dependencies(["core"])),
        ),
    );
    pipeline.run(&sources(dir.path(), &[script])).await.unwrap();

    for sub in [&mut first_sub, &mut second_sub] {
        let one = with_timeout(sub.recv()).await.unwrap();
        let two = with_timeout(sub.recv()).await.unwrap();
        assert_eq!(one.names(), vec!["core"]);
        assert_eq!(two.names(), vec!["core", "cli"]);
        assert!(sub.try_recv().is_err());
    }
}

#[tokio::test]
async fn failed_run_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path(), "Build.kts", "val core = project { }\n");

    let compiler = FakeCompiler::new();
    compiler.fail_for(&script, "syntax error");
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);
    let mut sub = pipeline.notifier().subscribe();

    assert!(pipeline.run(&sources(dir.path(), &[script])).await.is_err());
    assert!(sub.try_recv().is_err());
}

#[tokio::test]
async fn run_without_subscribers_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let compiler = FakeCompiler::new();
    let resolver = FakeResolver::new(dir.path().join("repo"));
    let pipeline = pipeline(dir.path(), &compiler, &resolver);

    let outcome = pipeline.run(&[]).await.unwrap();
    assert!(outcome.projects.is_empty());
    assert_eq!(pipeline.notifier().subscriber_count(), 0);
}
