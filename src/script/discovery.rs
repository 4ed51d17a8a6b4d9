// src/script/discovery.rs

//! Locate build scripts below a project root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

/// Compiled include/exclude patterns for script discovery.
///
/// Patterns are matched against paths relative to the project root, using
/// `/` as separator on every platform.
#[derive(Debug, Clone)]
pub struct ScriptPatterns {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl ScriptPatterns {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = build_globset(include).context("compiling [scripts].include patterns")?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("compiling [scripts].exclude patterns")?)
        };
        Ok(Self { include, exclude })
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern '{pat}'"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Walk `root` and return every script matching `patterns`, sorted by path.
///
/// Anything below `skip_dir` (the cache directory) is ignored so generated
/// bootstrap sources never get picked up as scripts.
pub fn discover_scripts(root: &Path, patterns: &ScriptPatterns, skip_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(skip_dir));

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {:?}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if patterns.matches(&rel) {
            debug!(script = %rel, "discovered build script");
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discovers_matching_scripts_in_sorted_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join(".builddag/scripts")).unwrap();
        fs::write(root.join("b/Build.kts"), "").unwrap();
        fs::write(root.join("a/Build.kts"), "").unwrap();
        fs::write(root.join("a/Other.kts"), "").unwrap();
        fs::write(root.join(".builddag/scripts/Build.kts"), "").unwrap();

        let patterns = ScriptPatterns::new(&["**/Build.kts".to_string()], &[]).unwrap();
        let found = discover_scripts(root, &patterns, &root.join(".builddag")).unwrap();

        assert_eq!(found, vec![root.join("a/Build.kts"), root.join("b/Build.kts")]);
    }

    #[test]
    fn exclude_patterns_win_over_include() {
        let patterns = ScriptPatterns::new(
            &["**/*.kts".to_string()],
            &["vendor/**".to_string()],
        )
        .unwrap();

        assert!(patterns.matches("app/Build.kts"));
        assert!(!patterns.matches("vendor/lib/Build.kts"));
        assert!(!patterns.matches("app/build.gradle"));
    }
}
