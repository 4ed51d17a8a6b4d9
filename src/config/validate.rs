// src/config/validate.rs

use crate::compile::process::{OUTPUT_PLACEHOLDER, SOURCE_PLACEHOLDER};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuilddagError, Result};
use crate::script::ScriptPatterns;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BuilddagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_engine(cfg)?;
    validate_scripts(cfg)?;
    validate_compiler(cfg)?;
    validate_notifier(cfg)?;
    validate_test(cfg)?;
    Ok(())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.cache_dir.as_os_str().is_empty() {
        return Err(BuilddagError::ConfigError(
            "[engine].cache_dir must not be empty".to_string(),
        ));
    }
    if cfg.engine.version.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(BuilddagError::ConfigError(
            "[engine].version must not be empty when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scripts.include.is_empty() {
        return Err(BuilddagError::ConfigError(
            "[scripts].include must contain at least one pattern".to_string(),
        ));
    }
    ScriptPatterns::new(&cfg.scripts.include, &cfg.scripts.exclude)
        .map_err(|e| BuilddagError::ConfigError(format!("[scripts]: {e:#}")))?;
    Ok(())
}

fn validate_compiler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.compiler.program.trim().is_empty() {
        return Err(BuilddagError::ConfigError(
            "[compiler].program must not be empty".to_string(),
        ));
    }
    for placeholder in [SOURCE_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
        if !cfg.compiler.args.iter().any(|a| a.contains(placeholder)) {
            return Err(BuilddagError::ConfigError(format!(
                "[compiler].args must contain {placeholder}"
            )));
        }
    }
    if cfg.compiler.timeout_secs == Some(0) {
        return Err(BuilddagError::ConfigError(
            "[compiler].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_notifier(cfg: &RawConfigFile) -> Result<()> {
    if cfg.notifier.capacity == 0 {
        return Err(BuilddagError::ConfigError(
            "[notifier].capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_test(cfg: &RawConfigFile) -> Result<()> {
    if cfg.test.program.trim().is_empty() {
        return Err(BuilddagError::ConfigError(
            "[test].program must not be empty".to_string(),
        ));
    }
    Ok(())
}
