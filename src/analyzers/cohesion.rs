//! Cohesion analyzer (LCOM).
//!
//! For every class an undirected method graph is built: two methods are
//! connected when they touch a common field or when one calls the other on
//! the same class. LCOM is the number of connected components of that
//! graph, so 1 is a fully cohesive class and a class whose methods share
//! nothing scores its method count.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::read_class_views;
use crate::bytecode::{normalize_internal_name, ClassView, Instruction};
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, Result};

/// Cohesion analyzer configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum allowed LCOM (0 = no limit).
    pub break_on_lcom: u32,
}

/// Method usage collected from one method body.
#[derive(Debug, Default)]
struct MethodUsage {
    fields: BTreeSet<String>,
    calls: BTreeSet<String>,
}

/// Computes per-class cohesion.
#[derive(Default)]
pub struct Calculator<'a> {
    observer: Option<&'a dyn Fn(&str)>,
}

impl<'a> Calculator<'a> {
    pub fn new() -> Self {
        Self { observer: None }
    }

    /// Calls `observer` with the name of every analyzed class.
    pub fn with_observer(mut self, observer: &'a dyn Fn(&str)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Cohesion of every class, in input order. Module descriptors are skipped.
    pub fn compute(&self, views: &[ClassView]) -> Vec<ClassCohesion> {
        views
            .iter()
            .filter(|view| !view.is_module_descriptor() && !view.name.is_empty())
            .map(|view| {
                if let Some(observer) = self.observer {
                    observer(&view.normalized_name());
                }
                class_cohesion(view)
            })
            .collect()
    }
}

/// Builds the method graph of one class and counts its components.
pub fn class_cohesion(view: &ClassView) -> ClassCohesion {
    let this = view.normalized_name();

    // Overloads share a vertex and their usage is merged.
    let mut usage: BTreeMap<&str, MethodUsage> = BTreeMap::new();
    let mut methods: Vec<String> = Vec::new();
    for method in &view.methods {
        if !usage.contains_key(method.name.as_str()) {
            methods.push(method.name.clone());
        }
        let entry = usage.entry(method.name.as_str()).or_default();
        for instruction in &method.instructions {
            match instruction {
                Instruction::FieldAccess { name, .. } => {
                    entry.fields.insert(name.clone());
                }
                Instruction::Invoke { owner, name, .. }
                    if normalize_internal_name(owner) == this =>
                {
                    entry.calls.insert(name.clone());
                }
                _ => {}
            }
        }
    }

    let mut graph: UnGraph<String, ()> = UnGraph::default();
    let nodes: Vec<NodeIndex> = methods.iter().map(|m| graph.add_node(m.clone())).collect();

    for (i, a) in methods.iter().enumerate() {
        let a_usage = &usage[a.as_str()];
        for (j, b) in methods.iter().enumerate().skip(i + 1) {
            let b_usage = &usage[b.as_str()];
            let shares_field = !a_usage.fields.is_disjoint(&b_usage.fields);
            let calls = a_usage.calls.contains(b) || b_usage.calls.contains(a);
            if shares_field || calls {
                graph.update_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let lcom = connected_components(&graph);
    let edges = graph
        .edge_indices()
        .filter_map(|e| graph.edge_endpoints(e))
        .map(|(a, b)| (graph[a].clone(), graph[b].clone()))
        .collect();

    debug!(class = %this, methods = methods.len(), lcom, "Computed cohesion");
    ClassCohesion {
        class: this,
        lcom,
        methods,
        edges,
    }
}

/// LCOM per normalized class name.
pub fn compute_cohesion_scores(views: &[ClassView]) -> BTreeMap<String, usize> {
    Calculator::new()
        .compute(views)
        .into_iter()
        .map(|c| (c.class, c.lcom))
        .collect()
}

/// Cohesion analyzer.
pub struct Analyzer {
    config: Config,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Creates a new cohesion analyzer with default config.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Creates a new analyzer with the specified config.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Sets the LCOM threshold.
    pub fn with_break_on_lcom(mut self, threshold: u32) -> Self {
        self.config.break_on_lcom = threshold;
        self
    }

    /// Analyzes already decoded class views.
    pub fn analyze_views(&self, views: &[ClassView]) -> Analysis {
        let mut classes = Calculator::new().compute(views);
        // Least cohesive first
        classes.sort_by(|a, b| b.lcom.cmp(&a.lcom).then_with(|| a.class.cmp(&b.class)));

        let summary = calculate_summary(&classes);
        info!(
            classes = summary.total_classes,
            max_lcom = summary.max_lcom,
            "Computed cohesion"
        );
        Analysis {
            generated_at: Utc::now().to_rfc3339(),
            classes,
            summary,
        }
    }

    /// Fails when the configured LCOM threshold is exceeded.
    pub fn check_thresholds(&self, analysis: &Analysis) -> Result<()> {
        let limit = self.config.break_on_lcom as usize;
        if limit == 0 || analysis.summary.max_lcom <= limit {
            return Ok(());
        }
        let worst = analysis.classes.first().map(|c| c.class.as_str()).unwrap_or("");
        Err(Error::threshold_violation(
            format!(
                "LCOM {} of {} exceeds threshold {}",
                analysis.summary.max_lcom, worst, limit
            ),
            analysis.summary.max_lcom as f64,
        ))
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "cohesion"
    }

    fn description(&self) -> &'static str {
        "Compute LCOM from per-class method graphs"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let views = read_class_views(ctx)?;
        Ok(self.analyze_views(&views))
    }

    fn configure(&mut self, config: &crate::config::Config) -> Result<()> {
        self.config.break_on_lcom = config.cohesion.break_on_lcom;
        Ok(())
    }
}

fn calculate_summary(classes: &[ClassCohesion]) -> Summary {
    if classes.is_empty() {
        return Summary::default();
    }

    let total_lcom: usize = classes.iter().map(|c| c.lcom).sum();
    Summary {
        total_classes: classes.len(),
        avg_lcom: total_lcom as f64 / classes.len() as f64,
        max_lcom: classes.iter().map(|c| c.lcom).max().unwrap_or(0),
        low_cohesion_count: classes.iter().filter(|c| c.lcom > 1).count(),
    }
}

/// Cohesion analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// When the analysis was generated.
    pub generated_at: String,
    /// Per-class results, least cohesive first.
    pub classes: Vec<ClassCohesion>,
    /// Summary statistics.
    pub summary: Summary,
}

impl Analysis {
    /// LCOM keyed by class name.
    pub fn scores(&self) -> BTreeMap<&str, usize> {
        self.classes.iter().map(|c| (c.class.as_str(), c.lcom)).collect()
    }
}

/// Cohesion of a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCohesion {
    /// Normalized class name.
    pub class: String,
    /// Connected components of the method graph.
    pub lcom: usize,
    /// Method vertices.
    pub methods: Vec<String>,
    /// Method graph edges.
    #[serde(skip)]
    pub edges: Vec<(String, String)>,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_classes: usize,
    pub avg_lcom: f64,
    pub max_lcom: usize,
    /// Classes with LCOM > 1.
    pub low_cohesion_count: usize,
}
