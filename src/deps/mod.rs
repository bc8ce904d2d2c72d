//! Sources of class-level dependency graphs.
//!
//! Cycle analysis does not derive dependencies itself; it asks a
//! [`DependencySource`] for a [`DependencyGraph`]. Two sources exist: an
//! existing DOT file, and the JDK's `jdeps` tool run over a class directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::core::{Error, Result};
use crate::graph::dot::parse_dependency_dot;
use crate::graph::DependencyGraph;

/// Produces a dependency graph.
pub trait DependencySource {
    /// Short label used in logs.
    fn describe(&self) -> String;

    /// Loads the graph.
    fn load(&self) -> Result<DependencyGraph>;
}

/// A graph already loaded in memory.
impl DependencySource for DependencyGraph {
    fn describe(&self) -> String {
        format!("in-memory graph ({} vertices)", self.vertex_count())
    }

    fn load(&self) -> Result<DependencyGraph> {
        Ok(self.clone())
    }
}

/// Reads a DOT file such as `jdeps -dotoutput` produces.
#[derive(Debug, Clone)]
pub struct DotFileSource {
    path: PathBuf,
}

impl DotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DependencySource for DotFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<DependencyGraph> {
        if !self.path.is_file() {
            return Err(Error::FileNotFound {
                path: self.path.clone(),
            });
        }
        let text = std::fs::read_to_string(&self.path)?;
        let graph = parse_dependency_dot(&text);
        debug!(
            path = %self.path.display(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "Imported dependency graph"
        );
        Ok(graph)
    }
}

/// Runs `jdeps -verbose:class` over a class directory.
#[derive(Debug, Clone)]
pub struct JdepsSource {
    binary: String,
    classes_dir: PathBuf,
    dot_dir: PathBuf,
}

impl JdepsSource {
    /// `dot_dir` receives the DOT files jdeps writes.
    pub fn new(
        binary: impl Into<String>,
        classes_dir: impl Into<PathBuf>,
        dot_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            classes_dir: classes_dir.into(),
            dot_dir: dot_dir.into(),
        }
    }

    /// Arguments passed to jdeps.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-dotoutput".to_string(),
            self.dot_dir.display().to_string(),
            "-verbose:class".to_string(),
            "-filter:none".to_string(),
            self.classes_dir.display().to_string(),
        ]
    }

    /// DOT file jdeps writes for the class directory: `<dot_dir>/<dir name>.dot`.
    pub fn dot_file(&self) -> PathBuf {
        let name = self
            .classes_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classes".to_string());
        self.dot_dir.join(format!("{name}.dot"))
    }
}

impl DependencySource for JdepsSource {
    fn describe(&self) -> String {
        format!("{} {}", self.binary, self.args().join(" "))
    }

    fn load(&self) -> Result<DependencyGraph> {
        if !self.classes_dir.is_dir() {
            return Err(Error::FileNotFound {
                path: self.classes_dir.clone(),
            });
        }
        std::fs::create_dir_all(&self.dot_dir)?;

        info!(command = %self.describe(), "Running jdeps");
        let output = Command::new(&self.binary)
            .args(self.args())
            .output()
            .map_err(|e| Error::external_tool(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::external_tool(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let dot_file = self.dot_file();
        if !dot_file.is_file() {
            return Err(Error::external_tool(format!(
                "{} did not write {}",
                self.binary,
                dot_file.display()
            )));
        }
        DotFileSource::new(dot_file).load()
    }
}
