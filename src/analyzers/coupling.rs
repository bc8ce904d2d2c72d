//! Coupling analyzer.
//!
//! Builds the class coupling multigraph from decoded class files and derives:
//! - CBO: number of distinct classes a class depends on (outgoing relations)
//! - pair CBO: number of relations between two classes, in both directions
//!
//! Relations are extracted directly from bytecode:
//!
//! | Relation                 | Source                                          |
//! |--------------------------|-------------------------------------------------|
//! | `SUPERCLASS`             | declared superclass (except the root class)     |
//! | `INSTANCE_VARIABLE`      | declared field types                            |
//! | `CALLS_METHOD`           | `invoke*` owners (not `invokedynamic`)          |
//! | `ACCESS_PUBLIC_VARIABLE` | `get/put field/static` owners                   |
//! | `LOCAL_VARIABLE`         | local-variable table entries                    |
//! | `PARAMETER_TYPE`         | method parameter types                          |
//!
//! Every occurrence yields its own edge. Platform classes, primitives and
//! self-references never do.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::read_class_views;
use crate::bytecode::{normalize_descriptor, normalize_internal_name, ClassView, Instruction};
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, Result};
use crate::graph::{CouplingGraph, RelationKind};

/// Coupling analyzer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Internal-name prefixes of platform classes.
    pub platform_prefixes: Vec<String>,
    /// Universal root class.
    pub root_class: String,
    /// Maximum allowed per-class CBO (0 = no limit).
    pub break_on_cbo: u32,
    /// Maximum allowed pair CBO (0 = no limit).
    pub break_on_pair_cbo: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(&crate::config::CouplingConfig::default())
    }
}

impl From<&crate::config::CouplingConfig> for Config {
    fn from(config: &crate::config::CouplingConfig) -> Self {
        Self {
            platform_prefixes: config.platform_prefixes.clone(),
            root_class: config.root_class.clone(),
            break_on_cbo: config.break_on_cbo,
            break_on_pair_cbo: config.break_on_pair_cbo,
        }
    }
}

/// Builds a [`CouplingGraph`] from class views.
pub struct GraphBuilder<'a> {
    platform_prefixes: &'a [String],
    root_class: String,
    observer: Option<&'a dyn Fn(&str)>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            platform_prefixes: &config.platform_prefixes,
            root_class: normalize_internal_name(&config.root_class),
            observer: None,
        }
    }

    /// Calls `observer` with the name of every class added to the graph.
    pub fn with_observer(mut self, observer: &'a dyn Fn(&str)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the multigraph.
    ///
    /// Fails on the first method whose descriptor cannot be decoded.
    pub fn build(&self, views: &[ClassView]) -> Result<CouplingGraph> {
        let mut graph = CouplingGraph::new();
        for view in views {
            self.add_class(&mut graph, view)?;
        }
        info!(
            classes = graph.vertex_count(),
            relations = graph.edge_count(),
            "Built coupling graph"
        );
        Ok(graph)
    }

    fn add_class(&self, graph: &mut CouplingGraph, view: &ClassView) -> Result<()> {
        if view.is_module_descriptor() {
            return Ok(());
        }
        let this = view.normalized_name();
        if this.is_empty() {
            return Ok(());
        }
        if let Some(observer) = self.observer {
            observer(&this);
        }
        graph.ensure_vertex(&this);

        if let Some(super_name) = &view.super_name {
            let super_name = normalize_internal_name(super_name);
            if !super_name.is_empty() && super_name != self.root_class {
                graph.add_relation(&this, &super_name, RelationKind::Superclass);
            }
        }

        for field in &view.fields {
            let target = normalize_descriptor(&field.descriptor);
            self.relate(graph, &this, &target, RelationKind::InstanceVariable);
        }

        for method in &view.methods {
            for instruction in &method.instructions {
                let (owner, kind) = match instruction {
                    Instruction::Invoke { owner, .. } => (owner, RelationKind::CallsMethod),
                    Instruction::FieldAccess { owner, .. } => {
                        (owner, RelationKind::AccessPublicVariable)
                    }
                    Instruction::Other(_) => continue,
                };
                self.relate(graph, &this, &normalize_internal_name(owner), kind);
            }

            for local in &method.local_variables {
                let target = normalize_descriptor(&local.descriptor);
                self.relate(graph, &this, &target, RelationKind::LocalVariable);
            }

            let params = method
                .parameter_types()
                .map_err(|e| Error::analysis(format!("{}.{}: {}", view.name, method.name, e)))?;
            for param in &params {
                let target = normalize_descriptor(param);
                self.relate(graph, &this, &target, RelationKind::ParameterType);
            }
        }

        debug!(class = %this, out = graph.out_degree(&this), "Added class relations");
        Ok(())
    }

    fn relate(&self, graph: &mut CouplingGraph, this: &str, target: &str, kind: RelationKind) {
        if self.is_excluded(this, target) {
            return;
        }
        graph.add_relation(this, target, kind);
    }

    /// Empty names, platform classes and self-references are not relations.
    fn is_excluded(&self, this: &str, target: &str) -> bool {
        target.is_empty()
            || target == this
            || self
                .platform_prefixes
                .iter()
                .any(|prefix| target.starts_with(prefix.as_str()))
    }
}

/// Builds the coupling graph with the default platform settings.
pub fn build_coupling_graph(views: &[ClassView]) -> Result<CouplingGraph> {
    GraphBuilder::new(&Config::default()).build(views)
}

/// Per-class CBO: the number of distinct out-neighbours of every vertex.
pub fn coupling_scores(graph: &CouplingGraph) -> BTreeMap<String, usize> {
    graph
        .vertices()
        .map(|v| (v.to_string(), graph.out_neighbors(v).len()))
        .collect()
}

/// Pair CBO for every unordered pair of distinct vertices, zero scores included.
///
/// Pairs are emitted in vertex insertion order: `(v0, v1), (v0, v2), ..., (v1, v2), ...`.
pub fn pairwise_coupling_scores(graph: &CouplingGraph) -> Vec<PairScore> {
    let vertices: Vec<&str> = graph.vertices().collect();
    let n = vertices.len();
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for (i, first) in vertices.iter().enumerate() {
        for second in &vertices[i + 1..] {
            let score =
                graph.edge_count_between(first, second) + graph.edge_count_between(second, first);
            pairs.push(PairScore {
                first: first.to_string(),
                second: second.to_string(),
                score,
            });
        }
    }
    pairs
}

/// Coupling analyzer.
pub struct Analyzer {
    config: Config,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Creates a new coupling analyzer with default config.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Creates a new analyzer with the specified config.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Sets the per-class CBO threshold.
    pub fn with_break_on_cbo(mut self, threshold: u32) -> Self {
        self.config.break_on_cbo = threshold;
        self
    }

    /// Sets the pair CBO threshold.
    pub fn with_break_on_pair_cbo(mut self, threshold: u32) -> Self {
        self.config.break_on_pair_cbo = threshold;
        self
    }

    /// Graph builder using this analyzer's platform settings.
    pub fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(&self.config)
    }

    /// Analyzes already decoded class views.
    pub fn analyze_views(&self, views: &[ClassView]) -> Result<Analysis> {
        let graph = self.builder().build(views)?;
        Ok(self.analyze_graph(graph))
    }

    /// Computes scores over a built graph.
    pub fn analyze_graph(&self, graph: CouplingGraph) -> Analysis {
        let scores = coupling_scores(&graph);
        let pairs = pairwise_coupling_scores(&graph);

        let mut classes: Vec<ClassCoupling> = scores
            .into_iter()
            .map(|(class, cbo)| ClassCoupling {
                in_degree: graph.in_degree(&class),
                out_degree: graph.out_degree(&class),
                class,
                cbo,
            })
            .collect();
        // Most coupled first
        classes.sort_by(|a, b| b.cbo.cmp(&a.cbo).then_with(|| a.class.cmp(&b.class)));

        let summary = calculate_summary(&graph, &classes, &pairs);
        Analysis {
            generated_at: Utc::now().to_rfc3339(),
            classes,
            pairs,
            summary,
            graph,
        }
    }

    /// Fails when a configured threshold is exceeded.
    pub fn check_thresholds(&self, analysis: &Analysis) -> Result<()> {
        let cbo_limit = self.config.break_on_cbo as usize;
        if cbo_limit > 0 && analysis.summary.max_cbo > cbo_limit {
            let worst = analysis.classes.first().map(|c| c.class.as_str()).unwrap_or("");
            return Err(Error::threshold_violation(
                format!(
                    "CBO {} of {} exceeds threshold {}",
                    analysis.summary.max_cbo, worst, cbo_limit
                ),
                analysis.summary.max_cbo as f64,
            ));
        }

        let pair_limit = self.config.break_on_pair_cbo as usize;
        if pair_limit > 0 && analysis.summary.max_pair_cbo > pair_limit {
            let worst = analysis
                .pairs
                .iter()
                .max_by_key(|p| p.score)
                .map(|p| format!("{} <-> {}", p.first, p.second))
                .unwrap_or_default();
            return Err(Error::threshold_violation(
                format!(
                    "pair CBO {} of {} exceeds threshold {}",
                    analysis.summary.max_pair_cbo, worst, pair_limit
                ),
                analysis.summary.max_pair_cbo as f64,
            ));
        }
        Ok(())
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "coupling"
    }

    fn description(&self) -> &'static str {
        "Build the class coupling multigraph and compute CBO and pair CBO"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let views = read_class_views(ctx)?;
        self.analyze_views(&views)
    }

    fn configure(&mut self, config: &crate::config::Config) -> Result<()> {
        // An empty prefix would match every class.
        if config.coupling.platform_prefixes.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidArgument(
                "coupling.platform_prefixes must not contain an empty prefix".to_string(),
            ));
        }
        self.config = Config::from(&config.coupling);
        Ok(())
    }
}

fn calculate_summary(
    graph: &CouplingGraph,
    classes: &[ClassCoupling],
    pairs: &[PairScore],
) -> Summary {
    let mut relations_by_kind = BTreeMap::new();
    for edge in graph.edges() {
        *relations_by_kind.entry(edge.kind).or_insert(0) += 1;
    }

    let total_cbo: usize = classes.iter().map(|c| c.cbo).sum();
    Summary {
        total_classes: classes.len(),
        total_relations: graph.edge_count(),
        avg_cbo: if classes.is_empty() {
            0.0
        } else {
            total_cbo as f64 / classes.len() as f64
        },
        max_cbo: classes.iter().map(|c| c.cbo).max().unwrap_or(0),
        max_pair_cbo: pairs.iter().map(|p| p.score).max().unwrap_or(0),
        coupled_pairs: pairs.iter().filter(|p| p.score > 0).count(),
        relations_by_kind,
    }
}

/// Coupling analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// When the analysis was generated.
    pub generated_at: String,
    /// Per-class scores, most coupled first.
    pub classes: Vec<ClassCoupling>,
    /// Pair CBO for every unordered pair of classes.
    pub pairs: Vec<PairScore>,
    /// Summary statistics.
    pub summary: Summary,
    /// The multigraph the scores were computed from.
    #[serde(skip)]
    pub graph: CouplingGraph,
}

impl Analysis {
    /// Per-class CBO keyed by class name.
    pub fn scores(&self) -> BTreeMap<&str, usize> {
        self.classes.iter().map(|c| (c.class.as_str(), c.cbo)).collect()
    }
}

/// Coupling of a single class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCoupling {
    /// Normalized class name.
    pub class: String,
    /// Distinct classes this class depends on.
    pub cbo: usize,
    /// Raw incoming relation count.
    pub in_degree: usize,
    /// Raw outgoing relation count.
    pub out_degree: usize,
}

/// Pair CBO of two classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairScore {
    pub first: String,
    pub second: String,
    pub score: usize,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_classes: usize,
    pub total_relations: usize,
    pub avg_cbo: f64,
    pub max_cbo: usize,
    pub max_pair_cbo: usize,
    /// Pairs with at least one relation.
    pub coupled_pairs: usize,
    pub relations_by_kind: BTreeMap<RelationKind, usize>,
}
