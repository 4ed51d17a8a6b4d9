// src/plugins/resolver.rs

//! Turning a plugin coordinate into a local artifact path.
//!
//! Real dependency resolution (downloading, transitive graphs, version
//! ranges) is someone else's job; this module only defines the seam and a
//! lookup in Maven-layout directories that are already on disk.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

/// Resolves a coordinate to an artifact location.
///
/// Called synchronously; the pipeline blocks until it returns.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, coordinate: &str, repositories: &[String]) -> Result<PathBuf>;
}

/// Looks coordinates up in local Maven-layout repositories:
/// `<repo>/<group as path>/<artifact>/<version>/<artifact>-<version>.jar`.
///
/// Repositories declared by `repos(...)` are searched first when they are
/// local paths or `file://` URLs; remote URLs are skipped.
#[derive(Debug, Clone, Default)]
pub struct LocalRepositoryResolver {
    roots: Vec<PathBuf>,
}

impl LocalRepositoryResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn candidate(root: &Path, group: &str, artifact: &str, version: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        for part in group.split('.') {
            path.push(part);
        }
        path.push(artifact);
        path.push(version);
        path.push(format!("{artifact}-{version}.jar"));
        path
    }
}

fn local_repository(repository: &str) -> Option<PathBuf> {
    if let Some(rest) = repository.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if repository.contains("://") {
        return None;
    }
    Some(PathBuf::from(repository))
}

impl DependencyResolver for LocalRepositoryResolver {
    fn resolve(&self, coordinate: &str, repositories: &[String]) -> Result<PathBuf> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        let (group, artifact, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, *v),
            [_, _] => bail!("plugin coordinate '{coordinate}' has no version; cannot resolve locally"),
            _ => bail!("malformed plugin coordinate '{coordinate}'"),
        };

        let search = repositories
            .iter()
            .filter_map(|r| local_repository(r))
            .chain(self.roots.iter().cloned());

        let mut tried = Vec::new();
        for root in search {
            let candidate = Self::candidate(&root, group, artifact, version);
            debug!(coordinate, candidate = ?candidate, "probing local repository");
            if candidate.is_file() {
                return Ok(candidate);
            }
            tried.push(candidate);
        }

        Err(anyhow!(
            "could not resolve plugin '{coordinate}'; looked in: {:?}",
            tried
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_artifact_in_maven_layout() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("org/example/lint/1.0/lint-1.0.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        fs::write(&jar, b"jar").unwrap();

        let resolver = LocalRepositoryResolver::new(vec![temp.path().to_path_buf()]);
        assert_eq!(resolver.resolve("org.example:lint:1.0", &[]).unwrap(), jar);
    }

    #[test]
    fn declared_file_repository_is_searched() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("g/a/2/a-2.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        fs::write(&jar, b"jar").unwrap();

        let resolver = LocalRepositoryResolver::default();
        let repos = vec![
            "https://remote.example.com/maven".to_string(),
            format!("file://{}", temp.path().display()),
        ];
        assert_eq!(resolver.resolve("g:a:2", &repos).unwrap(), jar);
    }

    #[test]
    fn missing_artifact_reports_coordinate() {
        let resolver = LocalRepositoryResolver::default();
        let err = resolver.resolve("g:a:2", &[]).unwrap_err();
        assert!(err.to_string().contains("g:a:2"));
    }

    #[test]
    fn versionless_coordinate_cannot_be_resolved_locally() {
        let resolver = LocalRepositoryResolver::default();
        assert!(resolver.resolve("g:a", &[]).is_err());
    }
}
