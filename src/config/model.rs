// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from `Builddag.toml`.
///
/// ```toml
/// [engine]
/// cache_dir = ".builddag"
///
/// [scripts]
/// include = ["**/Build.kts"]
/// exclude = ["vendor/**"]
///
/// [compiler]
/// program = "kotlinc"
/// args = ["-classpath", "{classpath}", "-d", "{output}", "{source}"]
/// timeout_secs = 300
///
/// [resolver]
/// local_repositories = ["/home/me/.m2/repository"]
///
/// [notifier]
/// capacity = 16
///
/// [test]
/// program = "java"
/// main_class = "org.junit.platform.console.ConsoleLauncher"
/// ```
///
/// Every section is optional. This is the unvalidated form; use
/// [`ConfigFile`] (via `TryFrom`) everywhere else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub compiler: CompilerSection,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub notifier: NotifierSection,

    #[serde(default)]
    pub test: TestSection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSection,
    pub scripts: ScriptsSection,
    pub compiler: CompilerSection,
    pub resolver: ResolverSection,
    pub notifier: NotifierSection,
    pub test: TestSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            engine: raw.engine,
            scripts: raw.scripts,
            compiler: raw.compiler,
            resolver: raw.resolver,
            notifier: raw.notifier,
            test: raw.test,
        }
    }

    /// Version written into cache stamps.
    pub fn engine_version(&self) -> String {
        self.engine
            .version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }

    /// Cache root, resolved against `project_root` when relative.
    pub fn cache_root(&self, project_root: &Path) -> PathBuf {
        if self.engine.cache_dir.is_absolute() {
            self.engine.cache_dir.clone()
        } else {
            project_root.join(&self.engine.cache_dir)
        }
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compiler.timeout_secs.map(Duration::from_secs)
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Overrides the version stamp; defaults to the crate version.
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Engine artifacts every script is compiled and loaded against.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".builddag")
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            version: None,
            cache_dir: default_cache_dir(),
            classpath: Vec::new(),
        }
    }
}

/// `[scripts]` section: which files are build scripts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    vec!["**/Build.kts".to_string()]
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: Vec::new(),
        }
    }
}

/// `[compiler]` section.
///
/// `args` is a template; `{classpath}`, `{source}` and `{output}` are
/// substituted per compilation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    #[serde(default = "default_compiler_program")]
    pub program: String,

    #[serde(default = "default_compiler_args")]
    pub args: Vec<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_compiler_program() -> String {
    "kotlinc".to_string()
}

fn default_compiler_args() -> Vec<String> {
    ["-classpath", "{classpath}", "-d", "{output}", "{source}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            program: default_compiler_program(),
            args: default_compiler_args(),
            timeout_secs: None,
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverSection {
    /// Maven-layout directories searched after any `repos(...)` entries.
    #[serde(default)]
    pub local_repositories: Vec<PathBuf>,
}

/// `[notifier]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    crate::engine::notifier::DEFAULT_CAPACITY
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// `[test]` section, used by the test runner.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    #[serde(default = "default_test_program")]
    pub program: String,

    #[serde(default)]
    pub main_class: Option<String>,
}

fn default_test_program() -> String {
    "java".to_string()
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            program: default_test_program(),
            main_class: None,
        }
    }
}
