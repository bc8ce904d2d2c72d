//! jsca CLI - Static coupling, cohesion and cycle analysis of JVM bytecode.

use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jsca::analyzers::{
    read_class_views, CohesionAnalyzer, CombinedAnalysis, CouplingAnalyzer, CyclesAnalyzer,
};
use jsca::bytecode::ClassView;
use jsca::cli::{Cli, Command, CyclesArgs};
use jsca::config::Config;
use jsca::core::{progress, AnalysisContext, Analyzer, ClassFileSet, Result};
use jsca::deps::{DependencySource, DotFileSource};
use jsca::output::{ArtifactWriter, Format};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };
    if let Some(dir) = &cli.output_dir {
        config.output.dir = Some(dir.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    let format = Format::from(config.output.format);
    let writer = match &config.output.dir {
        Some(dir) => Some(ArtifactWriter::new(dir)?),
        None => None,
    };

    match cli.command {
        Command::Coupling => {
            let files = ClassFileSet::from_path(&cli.path, &config)?;
            let mut analyzer = CouplingAnalyzer::new();
            let analysis = run_analyzer(&mut analyzer, &files, &config, format)?;
            persist(writer.as_ref(), |w| w.write_coupling(&analysis))?;
            analyzer.check_thresholds(&analysis)?;
        }
        Command::Cohesion => {
            let files = ClassFileSet::from_path(&cli.path, &config)?;
            let mut analyzer = CohesionAnalyzer::new();
            let analysis = run_analyzer(&mut analyzer, &files, &config, format)?;
            persist(writer.as_ref(), |w| w.write_cohesion(&analysis))?;
            analyzer.check_thresholds(&analysis)?;
        }
        Command::Cycles(CyclesArgs { dot: Some(dot) }) => {
            let mut analyzer = CyclesAnalyzer::new();
            analyzer.configure(&config)?;
            let source = DotFileSource::new(dot);
            info!(source = %source.describe(), "Importing dependency graph");
            let analysis = analyzer.analyze_graph(source.load()?);
            format.format(&analysis, &mut stdout())?;
            persist(writer.as_ref(), |w| w.write_cycles(&analysis))?;
            analyzer.check_thresholds(&analysis)?;
        }
        Command::Cycles(CyclesArgs { dot: None }) => {
            let files = ClassFileSet::from_path(&cli.path, &config)?;
            let mut analyzer = CyclesAnalyzer::new();
            let analysis = run_analyzer(&mut analyzer, &files, &config, format)?;
            persist(writer.as_ref(), |w| w.write_cycles(&analysis))?;
            analyzer.check_thresholds(&analysis)?;
        }
        Command::All => {
            let files = ClassFileSet::from_path(&cli.path, &config)?;
            let mut coupling = CouplingAnalyzer::new();
            coupling.configure(&config)?;
            let mut cohesion = CohesionAnalyzer::new();
            cohesion.configure(&config)?;

            let views = read_views(&files, &config)?;
            let combined = CombinedAnalysis::from_views(&coupling, &cohesion, &views)?;
            format.format(&combined, &mut stdout())?;
            persist(writer.as_ref(), |w| w.write_coupling(&combined.coupling))?;
            persist(writer.as_ref(), |w| w.write_cohesion(&combined.cohesion))?;

            coupling.check_thresholds(&combined.coupling)?;
            cohesion.check_thresholds(&combined.cohesion)?;
        }
    }

    Ok(())
}

/// Configures and runs one analyzer, printing its result to stdout.
fn run_analyzer<A>(
    analyzer: &mut A,
    files: &ClassFileSet,
    config: &Config,
    format: Format,
) -> Result<A::Output>
where
    A: Analyzer,
{
    analyzer.configure(config)?;
    let bar = progress::create_progress(files.len(), analyzer.name());
    let ctx = AnalysisContext::new(files, config, None).with_progress(progress::callback(&bar));
    let result = analyzer.analyze(&ctx);
    bar.finish_and_clear();

    let result = result?;
    format.format(&result, &mut stdout())?;
    Ok(result)
}

/// Decodes the class files once for analyzers that share them.
fn read_views(files: &ClassFileSet, config: &Config) -> Result<Vec<ClassView>> {
    let bar = progress::create_progress(files.len(), "Reading classes");
    let ctx = AnalysisContext::new(files, config, None).with_progress(progress::callback(&bar));
    let views = read_class_views(&ctx);
    bar.finish_and_clear();
    views
}

fn persist<F>(writer: Option<&ArtifactWriter>, write: F) -> Result<()>
where
    F: FnOnce(&ArtifactWriter) -> Result<Vec<PathBuf>>,
{
    if let Some(writer) = writer {
        let written = write(writer)?;
        info!(dir = %writer.dir().display(), files = written.len(), "Wrote results");
    }
    Ok(())
}
