// src/dag/project.rs

//! Project nodes and the ordered result of a run.

use std::path::PathBuf;

use serde::Deserialize;

/// Canonical project name type.
pub type ProjectName = String;

/// A unit of build work.
///
/// Two nodes are the *same project* when both name and directory agree;
/// a second node reusing a name with a different directory is a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ProjectNode {
    pub name: ProjectName,

    /// Project directory, relative to the script that declared it.
    #[serde(default)]
    pub directory: PathBuf,

    /// Names of projects that must be built before this one.
    #[serde(default)]
    pub depends_on: Vec<ProjectName>,
}

impl ProjectNode {
    pub fn new(name: impl Into<ProjectName>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ProjectName>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `other` denotes the same project (name and directory).
    pub fn same_identity(&self, other: &ProjectNode) -> bool {
        self.name == other.name && self.directory == other.directory
    }
}

/// Projects in a valid build order: every project appears after all of its
/// dependencies. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedProjectSet {
    projects: Vec<ProjectNode>,
}

impl OrderedProjectSet {
    pub(crate) fn new(projects: Vec<ProjectNode>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[ProjectNode] {
        &self.projects
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectNode> {
        self.projects.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ProjectNode> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl<'a> IntoIterator for &'a OrderedProjectSet {
    type Item = &'a ProjectNode;
    type IntoIter = std::slice::Iter<'a, ProjectNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.projects.iter()
    }
}
