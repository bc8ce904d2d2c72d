//! Dependency cycle analyzer.
//!
//! Detects cycles in the class dependency graph and suggests edges to cut
//! using the Eades-Lin-Smyth heuristic:
//!
//! 1. Peel sinks off the graph, each prepended to `s2`.
//! 2. Peel sources off the graph, each appended to `s1`.
//! 3. Append the vertex with the largest `out - in` degree to `s1`.
//! 4. Repeat until the graph is empty.
//!
//! In the order `s1 ++ s2`, every edge pointing back to an earlier vertex
//! belongs to the feedback arc set. The result is small but not minimal.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::PathBuf;

use chrono::Utc;
use petgraph::algo::is_cyclic_directed;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, Result};
use crate::deps::{DependencySource, JdepsSource};
use crate::graph::{DependencyEdge, DependencyGraph};

/// Cycle analyzer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fail when a cycle exists.
    pub break_on_cycle: bool,
    /// jdeps binary.
    pub jdeps: String,
    /// Directory for jdeps DOT output (temporary directory when unset).
    pub dot_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            break_on_cycle: false,
            jdeps: "jdeps".to_string(),
            dot_dir: None,
        }
    }
}

/// Whether the graph contains a directed cycle.
pub fn has_cycles(graph: &DependencyGraph) -> bool {
    is_cyclic_directed(graph.inner())
}

/// Vertices without successors, in vertex order.
pub fn sinks(graph: &DependencyGraph) -> Vec<String> {
    graph
        .vertices()
        .filter(|v| graph.out_degree(v) == 0)
        .map(str::to_string)
        .collect()
}

/// Vertices without predecessors, in vertex order.
pub fn sources(graph: &DependencyGraph) -> Vec<String> {
    graph
        .vertices()
        .filter(|v| graph.in_degree(v) == 0)
        .map(str::to_string)
        .collect()
}

/// The first vertex with the largest `out-degree - in-degree`.
pub fn highest_degree_delta(graph: &DependencyGraph) -> Option<String> {
    let mut best: Option<(&str, i64)> = None;
    for vertex in graph.vertices() {
        let delta = graph.out_degree(vertex) as i64 - graph.in_degree(vertex) as i64;
        if best.is_none_or(|(_, score)| delta > score) {
            best = Some((vertex, delta));
        }
    }
    best.map(|(vertex, _)| vertex.to_string())
}

/// Linear vertex order used to pick feedback arcs.
pub fn vertex_ordering(graph: &DependencyGraph) -> Vec<String> {
    let mut work = graph.clone();
    let mut head: Vec<String> = Vec::with_capacity(graph.vertex_count());
    let mut tail: VecDeque<String> = VecDeque::new();

    while !work.is_empty() {
        loop {
            let found = sinks(&work);
            if found.is_empty() {
                break;
            }
            for sink in found {
                work.remove_vertex(&sink);
                tail.push_front(sink);
            }
        }

        loop {
            let found = sources(&work);
            if found.is_empty() {
                break;
            }
            for source in found {
                work.remove_vertex(&source);
                head.push(source);
            }
        }

        if let Some(vertex) = highest_degree_delta(&work) {
            work.remove_vertex(&vertex);
            head.push(vertex);
        }
    }

    head.extend(tail);
    head
}

/// Edges to remove to make the graph acyclic.
///
/// Empty for an acyclic graph. Deterministic for a given vertex and edge
/// insertion order.
pub fn compute_feedback_arc_set(graph: &DependencyGraph) -> BTreeSet<DependencyEdge> {
    let mut visited: HashSet<String> = HashSet::with_capacity(graph.vertex_count());
    let mut arcs = BTreeSet::new();

    for vertex in vertex_ordering(graph) {
        for target in graph.successors(&vertex) {
            if visited.contains(target) {
                arcs.insert(DependencyEdge::new(vertex.as_str(), target));
            }
        }
        visited.insert(vertex);
    }
    arcs
}

/// Dependency cycle analyzer.
pub struct Analyzer {
    config: Config,
    source: Option<Box<dyn DependencySource>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Creates a new cycle analyzer with default config.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            source: None,
        }
    }

    /// Creates a new analyzer with the specified config.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            source: None,
        }
    }

    /// Uses `source` instead of running jdeps on the analyzed directory.
    pub fn with_source(mut self, source: impl DependencySource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Fails the run when a cycle is found.
    pub fn with_break_on_cycle(mut self, enabled: bool) -> Self {
        self.config.break_on_cycle = enabled;
        self
    }

    /// Directory receiving jdeps DOT output.
    pub fn with_dot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dot_dir = Some(dir.into());
        self
    }

    /// Analyzes an already loaded dependency graph.
    pub fn analyze_graph(&self, graph: DependencyGraph) -> Analysis {
        let cyclic = has_cycles(&graph);
        let arcs = if cyclic {
            compute_feedback_arc_set(&graph)
        } else {
            BTreeSet::new()
        };

        info!(
            classes = graph.vertex_count(),
            dependencies = graph.edge_count(),
            has_cycles = cyclic,
            feedback_arcs = arcs.len(),
            "Analyzed dependency cycles"
        );
        for arc in &arcs {
            debug!(edge = %arc, "Feedback arc");
        }

        Analysis {
            generated_at: Utc::now().to_rfc3339(),
            has_cycles: cyclic,
            summary: Summary {
                total_classes: graph.vertex_count(),
                total_dependencies: graph.edge_count(),
                feedback_arc_count: arcs.len(),
            },
            feedback_arc_set: arcs.into_iter().collect(),
            graph,
        }
    }

    /// Fails when cycles are not allowed and one was found.
    pub fn check_thresholds(&self, analysis: &Analysis) -> Result<()> {
        if self.config.break_on_cycle && analysis.has_cycles {
            return Err(Error::threshold_violation(
                format!(
                    "dependency graph has cycles; {} edge(s) to cut",
                    analysis.feedback_arc_set.len()
                ),
                analysis.feedback_arc_set.len() as f64,
            ));
        }
        Ok(())
    }

    fn jdeps_source(&self, ctx: &AnalysisContext<'_>) -> JdepsSource {
        let dot_dir = self.config.dot_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("jsca-jdeps-{}", std::process::id()))
        });
        JdepsSource::new(&self.config.jdeps, ctx.root, dot_dir)
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "cycles"
    }

    fn description(&self) -> &'static str {
        "Detect dependency cycles and suggest a feedback arc set"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let graph = match &self.source {
            Some(source) => {
                debug!(source = %source.describe(), "Loading dependency graph");
                source.load()?
            }
            None => self.jdeps_source(ctx).load()?,
        };
        Ok(self.analyze_graph(graph))
    }

    fn configure(&mut self, config: &crate::config::Config) -> Result<()> {
        self.config.break_on_cycle = config.cycles.break_on_cycle;
        self.config.jdeps = config.cycles.jdeps.clone();
        if self.config.dot_dir.is_none() {
            self.config.dot_dir = config.output.dir.as_ref().map(|dir| dir.join("jdeps"));
        }
        Ok(())
    }
}

/// Cycle analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// When the analysis was generated.
    pub generated_at: String,
    /// Whether any cycle exists.
    pub has_cycles: bool,
    /// Edges to cut, sorted.
    pub feedback_arc_set: Vec<DependencyEdge>,
    /// Summary statistics.
    pub summary: Summary,
    /// The analyzed dependency graph.
    #[serde(skip)]
    pub graph: DependencyGraph,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_classes: usize,
    pub total_dependencies: usize,
    pub feedback_arc_count: usize,
}
