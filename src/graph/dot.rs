//! Graphviz DOT rendering and import.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use super::{CouplingGraph, DependencyEdge, DependencyGraph};

/// Quotes a DOT identifier.
pub fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Renders the coupling multigraph, one coloured and labelled edge per relation.
pub fn coupling_graph_to_dot(graph: &CouplingGraph) -> String {
    let mut out = String::from("digraph \"coupling\" {\n");
    for vertex in graph.vertices() {
        let _ = writeln!(out, "  {};", quote(vertex));
    }
    for edge in graph.edges() {
        let _ = writeln!(
            out,
            "  {} -> {} [label={}, color={}];",
            quote(edge.source),
            quote(edge.target),
            quote(edge.kind.as_str()),
            quote(edge.kind.color()),
        );
    }
    out.push_str("}\n");
    out
}

/// Renders a dependency graph, drawing `highlighted` edges red and bold.
pub fn dependency_graph_to_dot(
    graph: &DependencyGraph,
    highlighted: &BTreeSet<DependencyEdge>,
) -> String {
    let mut out = String::from("digraph \"dependencies\" {\n");
    for vertex in graph.vertices() {
        let _ = writeln!(out, "  {};", quote(vertex));
    }
    for edge in graph.edges() {
        let attrs = if highlighted.contains(&edge) {
            " [color=\"red\", style=\"bold\"]"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  {} -> {}{};",
            quote(&edge.source),
            quote(&edge.target),
            attrs
        );
    }
    out.push_str("}\n");
    out
}

/// Renders one class's undirected method graph.
pub fn method_graph_to_dot(class: &str, methods: &[String], edges: &[(String, String)]) -> String {
    let mut out = format!("graph {} {{\n", quote(class));
    for method in methods {
        let _ = writeln!(out, "  {};", quote(method));
    }
    for (a, b) in edges {
        let _ = writeln!(out, "  {} -- {};", quote(a), quote(b));
    }
    out.push_str("}\n");
    out
}

fn edge_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^"([^"]*)"\s*->\s*"([^"]*)"\s*(\[[^\]]*\])?\s*;?$"#).expect("valid regex")
    })
}

fn node_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"^"([^"]*)"\s*(\[[^\]]*\])?\s*;?$"#).expect("valid regex"))
}

/// Vertex id of a DOT label: its first whitespace-separated token.
///
/// `java.lang.Object (java.base)` becomes `java.lang.Object`.
fn vertex_id(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or("")
}

/// Parses a directed DOT graph such as the class-level output of `jdeps`.
///
/// Graph headers, closing braces, comments and attribute statements are
/// skipped. Lines that are none of these and not a node or edge statement
/// are logged and dropped.
pub fn parse_dependency_dot(text: &str) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty()
            || line.starts_with("//")
            || line.starts_with('#')
            || line == "}"
            || line.starts_with("digraph")
            || line.starts_with("strict")
            || is_attribute_statement(line)
        {
            continue;
        }

        if let Some(caps) = edge_pattern().captures(line) {
            let source = vertex_id(&caps[1]);
            let target = vertex_id(&caps[2]);
            if source.is_empty() || target.is_empty() {
                warn!(line = lineno + 1, "Skipping DOT edge with empty endpoint");
                continue;
            }
            graph.add_edge(source, target);
        } else if let Some(caps) = node_pattern().captures(line) {
            let id = vertex_id(&caps[1]);
            if !id.is_empty() {
                graph.add_vertex(id);
            }
        } else {
            warn!(line = lineno + 1, content = line, "Skipping unrecognized DOT line");
        }
    }

    graph
}

fn is_attribute_statement(line: &str) -> bool {
    ["graph", "node", "edge"].iter().any(|kw| {
        line.strip_prefix(kw)
            .is_some_and(|rest| rest.trim_start().starts_with('['))
    }) || (line.contains('=') && !line.contains("->") && !line.starts_with('"'))
}
