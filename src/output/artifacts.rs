//! Persisting analysis results as JSON and DOT files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::analyzers::{cohesion, coupling, cycles};
use crate::core::Result;
use crate::graph::dot;

pub const CBO_RESULTS: &str = "sca-coupling-cbo-results.json";
pub const PAIR_CBO_RESULTS: &str = "sca-coupling-pair-cbo-results.json";
pub const COUPLING_GRAPH: &str = "coupling_graph.dot";
pub const COHESION_RESULTS: &str = "sca-cohesion-results.json";
pub const CYCLES_RESULTS: &str = "sca-cycles-results.json";
pub const DEPENDENCY_GRAPH: &str = "dependency_graph.dot";

/// Writes result files into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `data` as pretty JSON.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&path, content)?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(path)
    }

    /// Writes a text file such as a DOT graph.
    pub fn write_text(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, content)?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(path)
    }

    /// CBO map, pair list and the coloured coupling graph.
    pub fn write_coupling(&self, analysis: &coupling::Analysis) -> Result<Vec<PathBuf>> {
        let pairs: Vec<Value> = analysis
            .pairs
            .iter()
            .map(|p| json!([p.first, p.second, p.score]))
            .collect();

        let written = vec![
            self.write_json(CBO_RESULTS, &analysis.scores())?,
            self.write_json(PAIR_CBO_RESULTS, &pairs)?,
            self.write_text(COUPLING_GRAPH, &dot::coupling_graph_to_dot(&analysis.graph))?,
        ];
        info!(dir = %self.dir.display(), files = written.len(), "Saved coupling results");
        Ok(written)
    }

    /// LCOM map and one method graph per class.
    pub fn write_cohesion(&self, analysis: &cohesion::Analysis) -> Result<Vec<PathBuf>> {
        let mut written = vec![self.write_json(COHESION_RESULTS, &analysis.scores())?];
        for class in &analysis.classes {
            let dot = dot::method_graph_to_dot(&class.class, &class.methods, &class.edges);
            written.push(self.write_text(&method_graph_file_name(&class.class), &dot)?);
        }
        info!(dir = %self.dir.display(), files = written.len(), "Saved cohesion results");
        Ok(written)
    }

    /// Feedback arc set and the dependency graph with those arcs highlighted.
    pub fn write_cycles(&self, analysis: &cycles::Analysis) -> Result<Vec<PathBuf>> {
        let arcs: Vec<[&str; 2]> = analysis
            .feedback_arc_set
            .iter()
            .map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();
        let highlighted: BTreeSet<_> = analysis.feedback_arc_set.iter().cloned().collect();

        let written = vec![
            self.write_json(CYCLES_RESULTS, &arcs)?,
            self.write_text(
                DEPENDENCY_GRAPH,
                &dot::dependency_graph_to_dot(&analysis.graph, &highlighted),
            )?,
        ];
        info!(dir = %self.dir.display(), files = written.len(), "Saved cycle results");
        Ok(written)
    }
}

/// `com/acme/Foo` becomes `com_acme_Foo_lcom_graph.dot`.
pub fn method_graph_file_name(class: &str) -> String {
    format!("{}_lcom_graph.dot", class.replace('/', "_"))
}
