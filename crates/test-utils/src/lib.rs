pub mod builders;
pub mod fakes;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::{Duration, SystemTime};

use builddag::engine::{Pipeline, PipelineOptions};
use builddag::fs::RealFileSystem;
use builddag::script::ScriptSource;
use tracing_subscriber::{fmt, EnvFilter};

use crate::fakes::{FakeCompiler, FakeResolver};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Write a build script below `root` and return its path.
///
/// The script is backdated by a minute so anything compiled from it is
/// strictly newer, whatever the filesystem's timestamp resolution.
pub fn write_script(root: &Path, rel: &str, body: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("script has a parent")).unwrap();
    std::fs::write(&path, body).unwrap();
    set_mtime(&path, SystemTime::now() - Duration::from_secs(60));
    path
}

/// Push a file's mtime `secs` seconds into the future.
pub fn touch_forward(path: &Path, secs: u64) {
    set_mtime(path, SystemTime::now() + Duration::from_secs(secs));
}

fn set_mtime(path: &Path, when: SystemTime) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(when).unwrap();
}

/// Fresh handles for `scripts`, as the CLI would create them.
pub fn sources(root: &Path, scripts: &[PathBuf]) -> Vec<ScriptSource> {
    scripts
        .iter()
        .map(|p| ScriptSource::from_path(&RealFileSystem, root, p).unwrap())
        .collect()
}

/// Pipeline over real files in `root`, with the fake compiler and
/// resolver. The cache lives in `<root>/.builddag`.
pub fn pipeline(root: &Path, compiler: &FakeCompiler, resolver: &FakeResolver) -> Pipeline {
    let mut options = PipelineOptions::new(root.join(".builddag"));
    options.engine_version = "test-1".to_string();
    Pipeline::new(options, Arc::new(compiler.clone()), Arc::new(resolver.clone()))
}
