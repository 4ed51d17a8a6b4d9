// src/exec/test_runner.rs

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

/// Runs compiled tests in a child process that shares our stdio.
///
/// The command line is
/// `<program> -classpath <classpath> <main_class> <args...>`.
#[derive(Debug, Clone)]
pub struct TestRunner {
    program: String,
    main_class: String,
}

impl TestRunner {
    pub fn new(program: impl Into<String>, main_class: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            main_class: main_class.into(),
        }
    }

    pub fn command_line(&self, classpath: &[PathBuf], args: &[String]) -> Result<Vec<String>> {
        let joined = std::env::join_paths(classpath).context("joining test classpath")?;
        let mut line = vec![
            self.program.clone(),
            "-classpath".to_string(),
            joined.to_string_lossy().into_owned(),
            self.main_class.clone(),
        ];
        line.extend(args.iter().cloned());
        Ok(line)
    }

    /// Returns `Ok(true)` iff the process exited with code 0.
    ///
    /// An empty `tests` list is a success and spawns nothing.
    pub async fn run(&self, classpath: &[PathBuf], tests: &[String]) -> Result<bool> {
        if tests.is_empty() {
            info!("no test classes found; nothing to run");
            return Ok(true);
        }

        let line = self.command_line(classpath, tests)?;
        info!(program = %self.program, main_class = %self.main_class, tests = tests.len(), "running tests");

        let status = Command::new(&line[0])
            .args(&line[1..])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("spawning test runner '{}'", self.program))?;

        info!(exit_code = status.code().unwrap_or(-1), success = status.success(), "test runner exited");
        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_test_list_succeeds_without_spawning() {
        let runner = TestRunner::new("builddag-no-such-program", "Main");
        assert!(runner.run(&[], &[]).await.unwrap());
    }

    #[test]
    fn command_line_layout() {
        let runner = TestRunner::new("java", "org.example.Launcher");
        let line = runner
            .command_line(&[PathBuf::from("/a.jar")], &["com.example.CoreTest".to_string()])
            .unwrap();
        assert_eq!(
            line,
            vec!["java", "-classpath", "/a.jar", "org.example.Launcher", "com.example.CoreTest"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_decides_success() {
        let ok = TestRunner::new("true", "Main");
        assert!(ok.run(&[], &["t".to_string()]).await.unwrap());

        let failing = TestRunner::new("false", "Main");
        assert!(!failing.run(&[], &["t".to_string()]).await.unwrap());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let runner = TestRunner::new("builddag-no-such-program", "Main");
        assert!(runner.run(&[], &["t".to_string()]).await.is_err());
    }
}
