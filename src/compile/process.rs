// src/compile/process.rs

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::compile::{CompileRequest, ScriptCompiler};
use crate::errors::{BuilddagError, Result};

pub const CLASSPATH_PLACEHOLDER: &str = "{classpath}";
pub const SOURCE_PLACEHOLDER: &str = "{source}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external compiler program.
///
/// Every argument of the template has its placeholders substituted; an
/// argument that is exactly `{classpath}` is dropped when the classpath is
/// empty, together with the argument right before it if that one is a flag
/// (e.g. `-classpath {classpath}`).
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: String,
    args: Vec<String>,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn render_args(&self, request: &CompileRequest) -> Result<Vec<String>> {
        let classpath = if request.classpath.is_empty() {
            String::new()
        } else {
            std::env::join_paths(&request.classpath)
                .context("joining compiler classpath")?
                .to_string_lossy()
                .into_owned()
        };
        let source = request.source.to_string_lossy();
        let output = request.output.to_string_lossy();

        let mut rendered: Vec<String> = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            if arg == CLASSPATH_PLACEHOLDER && classpath.is_empty() {
                if rendered.last().is_some_and(|prev| prev.starts_with('-')) {
                    rendered.pop();
                }
                continue;
            }
            rendered.push(
                arg.replace(CLASSPATH_PLACEHOLDER, &classpath)
                    .replace(SOURCE_PLACEHOLDER, &source)
                    .replace(OUTPUT_PLACEHOLDER, &output),
            );
        }
        Ok(rendered)
    }

    async fn run(&self, request: &CompileRequest) -> Result<()> {
        let args = self.render_args(request)?;
        info!(script = ?request.script, program = %self.program, "compiling");
        debug!(?args, "compiler arguments");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BuilddagError::compilation(&request.script, format!("cannot start '{}': {e}", self.program))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(script = ?request.script, "compiler: {}", line);
        }

        if !output.status.success() {
            for line in stderr.lines() {
                warn!(script = ?request.script, "compiler: {}", line);
            }
            let code = output.status.code().unwrap_or(-1);
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("compiler exited with code {code}")
            } else {
                format!("compiler exited with code {code}: {detail}")
            };
            return Err(BuilddagError::compilation(&request.script, message));
        }

        for line in stderr.lines() {
            debug!(script = ?request.script, "compiler: {}", line);
        }
        Ok(())
    }
}

impl ScriptCompiler for ProcessCompiler {
    fn compile<'a>(
        &'a self,
        request: &'a CompileRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}
