#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use builddag::dag::ProjectNode;
use zip::write::SimpleFileOptions;

/// Shorthand for a project whose directory equals its name.
pub fn project(name: &str) -> ProjectNode {
    ProjectNode::new(name, name)
}

/// Builder for one compiled module's metadata entry.
#[derive(Debug, Clone, Default)]
pub struct ModuleBuilder {
    name: String,
    plugins: Vec<String>,
    repos: Vec<String>,
    accessors: Vec<String>,
    methods: Vec<String>,
}

impl ModuleBuilder {
    /// `name` is the dotted module name, e.g. `build.Projects`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin(mut self, coordinate: &str) -> Self {
        self.plugins.push(coordinate.to_string());
        self
    }

    pub fn repo(mut self, repository: &str) -> Self {
        self.repos.push(repository.to_string());
        self
    }

    /// Zero-argument module-level accessor returning `project`.
    pub fn project(mut self, project: &ProjectNode) -> Self {
        let deps: Vec<String> = project.depends_on.iter().map(|d| format!("{d:?}")).collect();
        self.accessors.push(format!(
            "[[accessor]]\nname = {:?}\nproject = {{ name = {:?}, directory = {:?}, depends_on = [{}] }}\n",
            project.name,
            project.name,
            project.directory.to_string_lossy(),
            deps.join(", ")
        ));
        self
    }

    /// Accessor that takes arguments; never harvested.
    pub fn parameterised_project(mut self, accessor: &str, project: &ProjectNode, parameters: usize) -> Self {
        self.accessors.push(format!(
            "[[accessor]]\nname = {:?}\nparameters = {}\nproject = {{ name = {:?}, directory = {:?} }}\n",
            accessor,
            parameters,
            project.name,
            project.directory.to_string_lossy()
        ));
        self
    }

    pub fn value(mut self, accessor: &str, returns: &str) -> Self {
        self.accessors.push(format!(
            "[[accessor]]\nname = {accessor:?}\nreturns = {returns:?}\n"
        ));
        self
    }

    /// Method carrying the task marker.
    pub fn task(mut self, method: &str, description: &str) -> Self {
        self.methods.push(format!(
            "[[method]]\nname = {method:?}\ntask = {{ description = {description:?} }}\n"
        ));
        self
    }

    /// Plain method without a marker.
    pub fn method(mut self, method: &str) -> Self {
        self.methods.push(format!("[[method]]\nname = {method:?}\n"));
        self
    }

    pub fn entry_name(&self) -> String {
        format!("{}.mod", self.name.replace('.', "/"))
    }

    pub fn render(&self) -> String {
        let quote = |items: &[String]| {
            items
                .iter()
                .map(|i| format!("{i:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut out = String::new();
        if !self.plugins.is_empty() {
            out.push_str(&format!("plugins = [{}]\n", quote(&self.plugins)));
        }
        if !self.repos.is_empty() {
            out.push_str(&format!("repos = [{}]\n", quote(&self.repos)));
        }
        for section in self.accessors.iter().chain(self.methods.iter()) {
            out.push('\n');
            out.push_str(section);
        }
        out
    }
}

/// Builder for a compiled artifact archive.
#[derive(Debug, Clone, Default)]
pub struct ArtifactBuilder {
    entries: Vec<(String, String)>,
}

impl ArtifactBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: ModuleBuilder) -> Self {
        self.entries.push((module.entry_name(), module.render()));
        self
    }

    /// Raw entry, e.g. a broken module or a non-module resource.
    pub fn entry(mut self, name: &str, body: &str) -> Self {
        self.entries.push((name.to_string(), body.to_string()));
        self
    }

    /// Write the archive to `path`. The parent directory must already exist.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", path.display()))?;
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in &self.entries {
            zip.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }
}
