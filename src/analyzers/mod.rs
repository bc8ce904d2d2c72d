//! Class analyzers.

pub mod cohesion;
pub mod coupling;
pub mod cycles;

use serde::Serialize;
use tracing::debug;

use crate::bytecode::{read_class_file, ClassView};
use crate::core::{AnalysisContext, Result};

// Re-export analyzer types for convenience
pub use cohesion::Analyzer as CohesionAnalyzer;
pub use coupling::Analyzer as CouplingAnalyzer;
pub use cycles::Analyzer as CyclesAnalyzer;

/// Decodes every class file in the context, reporting progress per file.
///
/// The first unreadable or malformed file aborts the run.
pub fn read_class_views(ctx: &AnalysisContext<'_>) -> Result<Vec<ClassView>> {
    let total = ctx.files.len();
    let mut views = Vec::with_capacity(total);
    for (i, path) in ctx.files.iter().enumerate() {
        debug!(path = %ctx.files.relative_path(path).display(), "Reading class file");
        views.push(read_class_file(path)?);
        ctx.report_progress(i + 1, total);
    }
    Ok(views)
}

/// Coupling and cohesion of the same class set, emitted as one document.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedAnalysis {
    pub coupling: coupling::Analysis,
    pub cohesion: cohesion::Analysis,
}

impl CombinedAnalysis {
    /// Runs both analyzers over views decoded once.
    pub fn from_views(
        coupling: &CouplingAnalyzer,
        cohesion: &CohesionAnalyzer,
        views: &[ClassView],
    ) -> Result<Self> {
        Ok(Self {
            coupling: coupling.analyze_views(views)?,
            cohesion: cohesion.analyze_views(views),
        })
    }
}
