//! Directed multigraph of typed class relationships.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// Kind of structural relationship between two classes.
///
/// Kinds are descriptive only; no kind carries a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Superclass,
    InstanceVariable,
    CallsMethod,
    LocalVariable,
    ParameterType,
    AccessPublicVariable,
}

impl RelationKind {
    pub const ALL: [RelationKind; 6] = [
        RelationKind::Superclass,
        RelationKind::InstanceVariable,
        RelationKind::CallsMethod,
        RelationKind::LocalVariable,
        RelationKind::ParameterType,
        RelationKind::AccessPublicVariable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Superclass => "SUPERCLASS",
            RelationKind::InstanceVariable => "INSTANCE_VARIABLE",
            RelationKind::CallsMethod => "CALLS_METHOD",
            RelationKind::LocalVariable => "LOCAL_VARIABLE",
            RelationKind::ParameterType => "PARAMETER_TYPE",
            RelationKind::AccessPublicVariable => "ACCESS_PUBLIC_VARIABLE",
        }
    }

    /// Graphviz edge colour used when rendering the coupling graph.
    pub fn color(&self) -> &'static str {
        match self {
            RelationKind::Superclass => "violet",
            RelationKind::InstanceVariable => "chocolate",
            RelationKind::CallsMethod => "blue",
            RelationKind::LocalVariable => "orange",
            RelationKind::ParameterType => "green",
            RelationKind::AccessPublicVariable => "red",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed view of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationEdge<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub kind: RelationKind,
}

/// Class multigraph keyed by normalized class name.
///
/// Every occurrence of a relationship is its own edge, so two calls from `A`
/// to `B` are two parallel `CALLS_METHOD` edges. Vertices iterate in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct CouplingGraph {
    graph: DiGraph<String, RelationKind>,
    indices: HashMap<String, NodeIndex>,
}

impl CouplingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vertex for `name`, creating it if needed.
    pub fn ensure_vertex(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    /// Adds one edge, creating missing vertices.
    pub fn add_relation(&mut self, source: &str, target: &str, kind: RelationKind) {
        let from = self.ensure_vertex(source);
        let to = self.ensure_vertex(target);
        self.graph.add_edge(from, to, kind);
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

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Vertex names in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(move |idx| self.graph[idx].as_str())
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = RelationEdge<'_>> {
        self.graph.edge_references().map(move |edge| RelationEdge {
            source: self.graph[edge.source()].as_str(),
            target: self.graph[edge.target()].as_str(),
            kind: *edge.weight(),
        })
    }

    /// Number of parallel edges from `source` to `target`, of any kind.
    pub fn edge_count_between(&self, source: &str, target: &str) -> usize {
        match (self.indices.get(source), self.indices.get(target)) {
            (Some(&from), Some(&to)) => self.graph.edges_connecting(from, to).count(),
            _ => 0,
        }
    }

    /// Number of edges of `kind` from `source` to `target`.
    pub fn edge_count_of_kind(&self, source: &str, target: &str, kind: RelationKind) -> usize {
        match (self.indices.get(source), self.indices.get(target)) {
            (Some(&from), Some(&to)) => self
                .graph
                .edges_connecting(from, to)
                .filter(|e| *e.weight() == kind)
                .count(),
            _ => 0,
        }
    }

    /// Number of edges of `kind` in the whole graph.
    pub fn edge_count_by_kind(&self, kind: RelationKind) -> usize {
        self.graph
            .edge_references()
            .filter(|e| *e.weight() == kind)
            .count()
    }

    /// Raw number of outgoing edges.
    pub fn out_degree(&self, name: &str) -> usize {
        self.indices
            .get(name)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    /// Raw number of incoming edges.
    pub fn in_degree(&self, name: &str) -> usize {
        self.indices
            .get(name)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Distinct classes reachable by one outgoing edge.
    pub fn out_neighbors(&self, name: &str) -> BTreeSet<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect()
    }
}
