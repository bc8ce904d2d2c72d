//! Analyzer trait and shared analysis context.

use std::path::Path;

use serde::Serialize;

use super::{ClassFileSet, Result};
use crate::config::Config;

/// Trait implemented by all analyzers.
pub trait Analyzer {
    /// The result type produced by this analyzer.
    type Output: Serialize;

    /// Unique identifier for this analyzer.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Run analysis and return results.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output>;

    /// Configure the analyzer from config.
    fn configure(&mut self, _config: &Config) -> Result<()> {
        Ok(())
    }
}

/// Context shared by all analyzers during one run.
pub struct AnalysisContext<'a> {
    /// Directory holding the compiled classes.
    pub root: &'a Path,
    /// Class files to analyze.
    pub files: &'a ClassFileSet,
    /// Configuration.
    pub config: &'a Config,
    /// Progress callback.
    pub on_progress: Option<Box<dyn Fn(usize, usize) + 'a>>,
}

impl<'a> AnalysisContext<'a> {
    /// Create a new analysis context.
    pub fn new(files: &'a ClassFileSet, config: &'a Config, root: Option<&'a Path>) -> Self {
        Self {
            root: root.unwrap_or_else(|| files.root()),
            files,
            config,
            on_progress: None,
        }
    }

    /// Add progress callback.
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + 'a,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Report progress if callback is set.
    pub fn report_progress(&self, current: usize, total: usize) {
        if let Some(ref f) = self.on_progress {
            f(current, total);
        }
    }
}
