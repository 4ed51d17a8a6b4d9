// src/dag/mod.rs

//! Project graph assembly.
//!
//! - [`project`] defines project nodes and the ordered result.
//! - [`graph`] holds the directed dependency graph and its sort.
//! - [`assemble`] merges harvested and contributed projects into one order.

pub mod assemble;
pub mod graph;
pub mod project;

pub use assemble::assemble;
pub use graph::ProjectGraph;
pub use project::{OrderedProjectSet, ProjectName, ProjectNode};
