//! Core types and traits for class analysis.

mod analyzer;
mod class_set;
mod error;
pub mod progress;

pub use analyzer::{AnalysisContext, Analyzer};
pub use class_set::{ClassFileSet, CLASS_EXTENSION};
pub use error::{Error, Result};
