// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::project::{OrderedProjectSet, ProjectNode};
use crate::errors::{BuilddagError, Result};

/// Directed project graph.
///
/// Edge direction: dependency -> dependent. For `b.depends_on = ["a"]` we add
/// the edge `a -> b`.
///
/// Node indices are handed out in insertion order and nodes are never
/// removed, so the index doubles as the first-discovery rank used to break
/// ties when sorting.
#[derive(Debug, Default)]
pub struct ProjectGraph {
    graph: DiGraph<ProjectNode, ()>,
    by_name: HashMap<String, NodeIndex>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Add a project that was declared directly. Its name must be new.
    pub fn add_declared(&mut self, project: ProjectNode) -> Result<NodeIndex> {
        if self.by_name.contains_key(&project.name) {
            return Err(BuilddagError::DuplicateProject(project.name));
        }
        Ok(self.insert(project))
    }

    /// Add a project, or return the existing node if it is the same project.
    ///
    /// A node with the same name but a different directory is a duplicate.
    pub fn add_or_merge(&mut self, project: ProjectNode) -> Result<NodeIndex> {
        match self.by_name.get(&project.name) {
            Some(&idx) if self.graph[idx].same_identity(&project) => Ok(idx),
            Some(_) => Err(BuilddagError::DuplicateProject(project.name)),
            None => Ok(self.insert(project)),
        }
    }

    fn insert(&mut self, project: ProjectNode) -> NodeIndex {
        let name = project.name.clone();
        let idx = self.graph.add_node(project);
        self.by_name.insert(name, idx);
        idx
    }

    /// Record that `dependent` must be built after `dependency`.
    pub fn add_dependency(&mut self, dependency: NodeIndex, dependent: NodeIndex) {
        self.graph.update_edge(dependency, dependent, ());
    }

    /// Turn every node's declared `depends_on` names into edges.
    ///
    /// Fails if a name does not refer to any node in the graph.
    pub fn link_declared_dependencies(&mut self) -> Result<()> {
        let mut edges = Vec::new();
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            for dep in &node.depends_on {
                let Some(&dep_idx) = self.by_name.get(dep) else {
                    return Err(BuilddagError::UnknownProject {
                        project: node.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                edges.push((dep_idx, idx));
            }
        }
        for (from, to) in edges {
            self.add_dependency(from, to);
        }
        Ok(())
    }

    /// Topologically sort the graph.
    ///
    /// Kahn's algorithm with the ready set ordered by insertion rank, so the
    /// result is identical for identical input. A cycle yields an error and
    /// no partial order.
    pub fn into_ordered(self) -> Result<OrderedProjectSet> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(next) = ready.pop_first() {
            let idx = NodeIndex::new(next);
            order.push(idx);
            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                let d = &mut in_degree[dependent.index()];
                *d -= 1;
                if *d == 0 {
                    ready.insert(dependent.index());
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(BuilddagError::DependencyCycle(self.describe_cycle()));
        }

        let (nodes, _) = self.graph.into_nodes_edges();
        let mut slots: Vec<Option<ProjectNode>> = nodes.into_iter().map(|n| Some(n.weight)).collect();
        let projects: Vec<ProjectNode> = order
            .into_iter()
            .filter_map(|idx| slots[idx.index()].take())
            .collect();

        debug!(
            order = ?projects.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "project build order"
        );
        Ok(OrderedProjectSet::new(projects))
    }

    fn describe_cycle(&self) -> String {
        for mut component in tarjan_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.graph.contains_edge(n, n));
            if is_cycle {
                component.sort();
                let names: Vec<&str> = component
                    .iter()
                    .map(|&n| self.graph[n].name.as_str())
                    .collect();
                return format!("cycle detected among projects: {}", names.join(", "));
            }
        }
        "cycle detected in project graph".to_string()
    }
}
