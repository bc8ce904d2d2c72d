//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config;

/// jsca - Coupling, cohesion and dependency cycle metrics for JVM bytecode.
#[derive(Parser)]
#[command(name = "jsca")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the compiled classes
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format (defaults to `output.format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for JSON and DOT result files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Coupling between objects, per class and per class pair
    #[command(alias = "cbo")]
    Coupling,

    /// Lack of cohesion in methods
    #[command(alias = "lcom")]
    Cohesion,

    /// Dependency cycles and the edges to cut
    Cycles(CyclesArgs),

    /// Coupling and cohesion together
    All,
}

#[derive(Args, Default)]
pub struct CyclesArgs {
    /// Read the dependency graph from a DOT file instead of running jdeps
    #[arg(long)]
    pub dot: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => config::OutputFormat::Json,
            OutputFormat::Markdown => config::OutputFormat::Markdown,
            OutputFormat::Text => config::OutputFormat::Text,
        }
    }
}
