//! Simple directed class-dependency graph.

use std::collections::HashMap;
use std::fmt;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// A "depends on" edge between two classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
}

impl DependencyEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Directed graph with at most one edge per ordered pair and no self-loops.
///
/// Backed by a stable graph so vertices keep their insertion order while
/// others are removed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: StableDiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from `(source, target)` name pairs.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = Self::new();
        for (source, target) in edges {
            graph.add_edge(source, target);
        }
        graph
    }

    /// Adds a vertex if it is not present yet.
    pub fn add_vertex(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    /// Adds an edge, creating missing vertices.
    ///
    /// Returns `false` when the edge is a self-loop or already present.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        let from = self.add_vertex(source);
        if source == target {
            return false;
        }
        let to = self.add_vertex(target);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Removes a vertex and all its edges.
    pub fn remove_vertex(&mut self, name: &str) -> bool {
        match self.indices.remove(name) {
            Some(idx) => self.graph.remove_node(idx).is_some(),
            None => false,
        }
    }

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        match (self.indices.get(source), self.indices.get(target)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Vertex names in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.graph
            .node_indices()
            .map(move |idx| self.graph[idx].as_str())
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(from, to)| DependencyEdge::new(&self.graph[from], &self.graph[to]))
            .collect()
    }

    /// Direct successors of `name`.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct predecessors of `name`.
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    pub fn out_degree(&self, name: &str) -> usize {
        self.degree(name, Direction::Outgoing)
    }

    pub fn in_degree(&self, name: &str) -> usize {
        self.degree(name, Direction::Incoming)
    }

    /// Underlying petgraph graph, for algorithms from `petgraph::algo`.
    pub fn inner(&self) -> &StableDiGraph<String, ()> {
        &self.graph
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    fn degree(&self, name: &str, dir: Direction) -> usize {
        self.indices
            .get(name)
            .map(|&idx| self.graph.neighbors_directed(idx, dir).count())
            .unwrap_or(0)
    }
}
