// src/compile/mod.rs

//! Script compiler adapter.
//!
//! The pipeline talks to a [`ScriptCompiler`] instead of a concrete
//! toolchain. Production uses [`ProcessCompiler`], which runs an external
//! program; tests provide a fake that writes artifacts directly.

pub mod process;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::errors::{BuilddagError, Result};

pub use process::ProcessCompiler;

/// One compilation: `source` (the file actually handed to the toolchain)
/// into `output`, with `classpath` visible.
///
/// `script` names the build script the request belongs to, for errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub script: PathBuf,
    pub source: PathBuf,
    pub classpath: Vec<PathBuf>,
    pub output: PathBuf,
}

impl CompileRequest {
    pub fn new(script: impl Into<PathBuf>, source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            source: source.into(),
            classpath: Vec::new(),
            output: output.into(),
        }
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }
}

pub trait ScriptCompiler: Send + Sync {
    /// Compile the request. Toolchain failures are reported as
    /// [`BuilddagError::CompilationFailed`].
    fn compile<'a>(
        &'a self,
        request: &'a CompileRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Compile and verify that the toolchain actually produced the artifact.
pub async fn compile_checked(compiler: &dyn ScriptCompiler, request: &CompileRequest) -> Result<()> {
    compiler.compile(request).await?;
    ensure_output(request)
}

fn ensure_output(request: &CompileRequest) -> Result<()> {
    if Path::new(&request.output).is_file() {
        Ok(())
    } else {
        Err(BuilddagError::MissingArtifact {
            script: request.script.clone(),
            artifact: request.output.clone(),
        })
    }
}
