//! Graph types shared by the analyzers.
//!
//! - [`CouplingGraph`]: multigraph of typed class relationships
//! - [`DependencyGraph`]: simple "depends on" digraph used for cycle analysis
//! - [`dot`]: Graphviz rendering and import

mod coupling;
mod dependency;
pub mod dot;

pub use coupling::{CouplingGraph, RelationEdge, RelationKind};
pub use dependency::{DependencyEdge, DependencyGraph};
