//! jsca - Static structure analysis of compiled JVM classes.
//!
//! jsca reads `.class` files and reports three kinds of structural metrics:
//!
//! - **Coupling**: a typed multigraph of class relations, with CBO per class
//!   and pairwise CBO per class pair.
//! - **Cohesion**: LCOM per class, the number of connected components of the
//!   graph linking methods that share fields or call each other.
//! - **Cycles**: detection of dependency cycles and a feedback arc set that
//!   breaks them, over a graph imported from `jdeps` DOT output.
//!
//! # Example
//!
//! ```no_run
//! use jsca::analyzers::CouplingAnalyzer;
//! use jsca::core::{AnalysisContext, Analyzer, ClassFileSet};
//! use jsca::config::Config;
//!
//! let config = Config::default();
//! let files = ClassFileSet::from_path("target/classes", &config).unwrap();
//! let ctx = AnalysisContext::new(&files, &config, None);
//! let analyzer = CouplingAnalyzer::new();
//! let result = analyzer.analyze(&ctx).unwrap();
//! println!("Max CBO {}", result.summary.max_cbo);
//! ```

pub mod analyzers;
pub mod bytecode;
pub mod cli;
pub mod config;
pub mod core;
pub mod deps;
pub mod graph;
pub mod output;

pub use core::{AnalysisContext, Analyzer};
