// src/dag/assemble.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::graph::ProjectGraph;
use crate::dag::project::{OrderedProjectSet, ProjectNode};
use crate::errors::Result;
use crate::plugins::ProjectContributor;

/// Build the global project order from everything harvested in a run plus
/// whatever the contributors add.
///
/// Each contributor is asked exactly once. Contributed dependencies become
/// nodes even when nothing declared them.
pub fn assemble(
    harvested: Vec<ProjectNode>,
    contributors: &[Arc<dyn ProjectContributor>],
) -> Result<OrderedProjectSet> {
    let mut graph = ProjectGraph::new();

    for project in harvested {
        graph.add_declared(project)?;
    }

    for contributor in contributors {
        for contributed in contributor.contributed_projects() {
            let dependent = graph.add_or_merge(contributed.project)?;
            for dependency in contributed.depends_on {
                debug!(
                    dependency = %dependency.name,
                    dependent = ?dependent,
                    "contributed dependency edge"
                );
                let dependency = graph.add_or_merge(dependency)?;
                graph.add_dependency(dependency, dependent);
            }
        }
    }

    graph.link_declared_dependencies()?;

    let ordered = graph.into_ordered()?;
    info!(projects = ordered.len(), "project graph assembled");
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuilddagError;
    use crate::plugins::ContributedProject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        projects: Vec<ContributedProject>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(projects: Vec<ContributedProject>) -> Arc<Self> {
            Arc::new(Self {
                projects,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ProjectContributor for Fixed {
        fn contributed_projects(&self) -> Vec<ContributedProject> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.projects.clone()
        }
    }

    fn node(name: &str) -> ProjectNode {
        ProjectNode::new(name, name)
    }

    #[test]
    fn contributed_dependencies_become_nodes() {
        let contributor = Fixed::new(vec![ContributedProject::new(
            node("app"),
            vec![node("runtime")],
        )]);
        let contributors: Vec<Arc<dyn ProjectContributor>> = vec![contributor.clone()];

        let ordered = assemble(vec![node("core")], &contributors).unwrap();

        assert_eq!(ordered.names(), vec!["core", "runtime", "app"]);
        assert_eq!(contributor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn contributed_project_may_depend_on_harvested_one() {
        let contributors: Vec<Arc<dyn ProjectContributor>> = vec![Fixed::new(vec![
            ContributedProject::new(node("docs"), vec![node("core")]),
        ])];

        let ordered = assemble(vec![node("core")], &contributors).unwrap();
        assert!(ordered.position("core").unwrap() < ordered.position("docs").unwrap());
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn contributed_name_clash_is_a_duplicate() {
        let contributors: Vec<Arc<dyn ProjectContributor>> = vec![Fixed::new(vec![
            ContributedProject::new(ProjectNode::new("core", "vendor/core"), vec![]),
        ])];

        let err = assemble(vec![node("core")], &contributors).unwrap_err();
        assert!(matches!(err, BuilddagError::DuplicateProject(ref n) if n == "core"));
    }

    #[test]
    fn contributed_cycle_is_fatal() {
        let contributors: Vec<Arc<dyn ProjectContributor>> = vec![Fixed::new(vec![
            ContributedProject::new(node("a"), vec![node("b")]),
            ContributedProject::new(node("b"), vec![node("a")]),
        ])];

        assert!(matches!(
            assemble(Vec::new(), &contributors),
            Err(BuilddagError::DependencyCycle(_))
        ));
    }
}
