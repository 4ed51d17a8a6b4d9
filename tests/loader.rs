// tests/loader.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tempfile::TempDir;

use builddag::dag::ProjectNode;
use builddag::engine::RunContext;
use builddag::errors::BuilddagError;
use builddag::load::{
    ArchiveRuntime, ArtifactLoader, Declaration, LoadContext, LoadedModule, Member, MemberValue,
    ModuleRuntime, ReturnKind,
};
use builddag::plugins::{ClasspathInstaller, PluginDescriptor, PluginInstaller};
use builddag_test_utils::builders::{project, ArtifactBuilder, ModuleBuilder};

fn archive_loader() -> ArtifactLoader {
    ArtifactLoader::new(Arc::new(ArchiveRuntime), Arc::new(ClasspathInstaller))
}

fn write_artifact(dir: &Path, artifact: ArtifactBuilder) -> PathBuf {
    let path = dir.join("buildScript.jar");
    artifact.write_to(&path).unwrap();
    path
}

#[test]
fn accessor_returning_project_is_harvested() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new().module(
            ModuleBuilder::new("build.Projects")
                .project(&project("core"))
                .value("version", "String")
                .parameterised_project("variant", &project("core-variant"), 1),
        ),
    );

    let run = RunContext::new();
    let mut accumulated = Vec::new();
    let harvest = archive_loader()
        .load(&jar, &[], &run, &mut accumulated)
        .unwrap();

    let names: Vec<&str> = harvest.projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["core"]);
    assert_eq!(accumulated.len(), 1);
    assert_eq!(harvest.modules, vec!["build.Projects"]);
}

#[test]
fn synthetic_script_module_is_skipped() {
    let dir = TempDir::new().unwrap();
    // The script module's metadata is not even valid; it must never be read.
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new()
            .entry("Build.mod", "this is not toml = [")
            .module(ModuleBuilder::new("Other").project(&project("other"))),
    );

    let run = RunContext::new();
    let harvest = archive_loader()
        .load(&jar, &[], &run, &mut Vec::new())
        .unwrap();
    assert_eq!(harvest.modules, vec!["Other"]);
}

#[test]
fn declarations_register_plugins_and_repositories() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new().module(
            ModuleBuilder::new("Prelude")
                .repo("https://repo.example.com/maven")
                .plugin("org.example:lint:1.0")
                .plugin("org.example:fmt:2.1"),
        ),
    );

    let run = RunContext::new();
    archive_loader().load(&jar, &[], &run, &mut Vec::new()).unwrap();
    // Loading the same artifact again in the same run registers nothing new.
    archive_loader().load(&jar, &[], &run, &mut Vec::new()).unwrap();

    let ids: Vec<String> = run.plugins.snapshot().iter().map(|p| p.id().to_string()).collect();
    assert_eq!(ids, vec!["org.example:lint:1.0", "org.example:fmt:2.1"]);
    assert_eq!(run.plugins.repositories(), vec!["https://repo.example.com/maven"]);
}

#[test]
fn marked_methods_become_task_entry_points() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new().module(
            ModuleBuilder::new("build.Tasks")
                .task("publish", "Upload artifacts")
                .method("notATask"),
        ),
    );

    let run = RunContext::new();
    let harvest = archive_loader().load(&jar, &[], &run, &mut Vec::new()).unwrap();

    assert_eq!(harvest.tasks.len(), 1);
    assert_eq!(run.tasks.len(), 1);
    let task = run.tasks.find("publish").unwrap();
    assert_eq!(task.module, "build.Tasks");
    assert_eq!(task.marker.description, "Upload artifacts");
}

#[test]
fn name_already_accumulated_is_a_duplicate() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new().module(ModuleBuilder::new("P").project(&project("core"))),
    );

    let run = RunContext::new();
    let mut accumulated = vec![ProjectNode::new("core", "elsewhere")];
    let err = archive_loader()
        .load(&jar, &[], &run, &mut accumulated)
        .unwrap_err();

    assert!(matches!(err, BuilddagError::DuplicateProject(ref n) if n == "core"));
    assert_eq!(accumulated.len(), 1);
}

#[test]
fn broken_module_metadata_names_the_module() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(
        dir.path(),
        ArtifactBuilder::new().entry("build/Broken.mod", "[[accessor]]\nname = 3\n"),
    );

    let run = RunContext::new();
    match archive_loader().load(&jar, &[], &run, &mut Vec::new()) {
        Err(BuilddagError::ModuleLoad { module, .. }) => assert_eq!(module, "build.Broken"),
        other => panic!("expected ModuleLoad, got {other:?}"),
    }
}

// --- scripted runtime for failure modes ---------------------------------

#[derive(Clone, Copy)]
enum Behaviour {
    LoadFails,
    NotFound,
    InvokeFails,
    WrongReturn,
}

struct ScriptedRuntime {
    behaviour: Behaviour,
}

struct ScriptedContext {
    artifact: PathBuf,
    locations: Vec<PathBuf>,
    behaviour: Behaviour,
}

struct ScriptedModule {
    name: String,
    behaviour: Behaviour,
}

impl ModuleRuntime for ScriptedRuntime {
    fn create_context(&self, artifact: &Path, classpath: &[PathBuf]) -> anyhow::Result<Box<dyn LoadContext>> {
        Ok(Box::new(ScriptedContext {
            artifact: artifact.to_path_buf(),
            locations: classpath.to_vec(),
            behaviour: self.behaviour,
        }))
    }
}

impl LoadContext for ScriptedContext {
    fn artifact(&self) -> &Path {
        &self.artifact
    }

    fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    fn add_location(&mut self, location: PathBuf) {
        self.locations.push(location);
    }

    fn load_module(&mut self, name: &str) -> anyhow::Result<Option<Box<dyn LoadedModule>>> {
        match self.behaviour {
            Behaviour::LoadFails => Err(anyhow!("static initializer of {name} threw")),
            Behaviour::NotFound => Ok(None),
            b => Ok(Some(Box::new(ScriptedModule {
                name: name.to_string(),
                behaviour: b,
            }))),
        }
    }
}

impl LoadedModule for ScriptedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declarations(&self) -> Vec<Declaration> {
        Vec::new()
    }

    fn members(&self) -> anyhow::Result<Vec<Member>> {
        Ok(vec![Member::Accessor {
            name: "core".to_string(),
            parameters: 0,
            module_level: true,
            returns: ReturnKind::Project,
        }])
    }

    fn invoke(&self, accessor: &str) -> anyhow::Result<MemberValue> {
        match self.behaviour {
            Behaviour::WrongReturn => Ok(MemberValue::Other("String".to_string())),
            _ => Err(anyhow!("{accessor} getter threw IllegalStateException")),
        }
    }
}

fn scripted(behaviour: Behaviour) -> (TempDir, PathBuf, ArtifactLoader) {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(dir.path(), ArtifactBuilder::new().entry("build/Projects.mod", ""));
    let loader = ArtifactLoader::new(Arc::new(ScriptedRuntime { behaviour }), Arc::new(ClasspathInstaller));
    (dir, jar, loader)
}

#[test]
fn load_failure_preserves_the_cause() {
    let (_dir, jar, loader) = scripted(Behaviour::LoadFails);
    match loader.load(&jar, &[], &RunContext::new(), &mut Vec::new()) {
        Err(BuilddagError::ModuleLoad { module, source }) => {
            assert_eq!(module, "build.Projects");
            assert_eq!(source.to_string(), "static initializer of build.Projects threw");
        }
        other => panic!("expected ModuleLoad, got {other:?}"),
    }
}

#[test]
fn load_failure_without_cause_is_wrapped() {
    let (_dir, jar, loader) = scripted(Behaviour::NotFound);
    match loader.load(&jar, &[], &RunContext::new(), &mut Vec::new()) {
        Err(BuilddagError::ModuleUnavailable { module }) => assert_eq!(module, "build.Projects"),
        other => panic!("expected ModuleUnavailable, got {other:?}"),
    }
}

#[test]
fn invocation_failure_names_module_and_member() {
    let (_dir, jar, loader) = scripted(Behaviour::InvokeFails);
    match loader.load(&jar, &[], &RunContext::new(), &mut Vec::new()) {
        Err(BuilddagError::MemberInvoke { module, member, source }) => {
            assert_eq!(module, "build.Projects");
            assert_eq!(member, "core");
            assert!(source.to_string().contains("IllegalStateException"));
        }
        other => panic!("expected MemberInvoke, got {other:?}"),
    }
}

#[test]
fn accessor_returning_something_else_is_rejected() {
    let (_dir, jar, loader) = scripted(Behaviour::WrongReturn);
    assert!(matches!(
        loader.load(&jar, &[], &RunContext::new(), &mut Vec::new()),
        Err(BuilddagError::MemberInvoke { .. })
    ));
}

// --- installer hook -----------------------------------------------------

struct RecordingInstaller {
    seen: Mutex<Vec<(Vec<String>, usize)>>,
}

impl PluginInstaller for RecordingInstaller {
    fn install(&self, plugins: &[Arc<PluginDescriptor>], context: &mut dyn LoadContext) {
        let ids = plugins.iter().map(|p| p.id().to_string()).collect();
        self.seen.lock().unwrap().push((ids, context.locations().len()));
    }
}

#[test]
fn installer_runs_once_per_fresh_context() {
    let dir = TempDir::new().unwrap();
    let jar = write_artifact(dir.path(), ArtifactBuilder::new());

    let installer = Arc::new(RecordingInstaller {
        seen: Mutex::new(Vec::new()),
    });
    let loader = ArtifactLoader::new(Arc::new(ArchiveRuntime), installer.clone());
    let run = RunContext::new();
    run.plugins.register("org.example:lint:1.0").unwrap();

    loader
        .load(&jar, &[PathBuf::from("/engine.jar")], &run, &mut Vec::new())
        .unwrap();
    loader.load(&jar, &[], &run, &mut Vec::new()).unwrap();

    let seen = installer.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (vec!["org.example:lint:1.0".to_string()], 1),
            (vec!["org.example:lint:1.0".to_string()], 0),
        ]
    );
}
