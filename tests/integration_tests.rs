mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use common::{write_sample_classes, ClassSpec, MethodSpec, ACC_MODULE};
use jsca::analyzers::{cohesion, coupling, CohesionAnalyzer, CouplingAnalyzer, CyclesAnalyzer};
use jsca::bytecode::{read_class_file, read_class_files, Instruction};
use jsca::config::Config;
use jsca::core::{AnalysisContext, Analyzer, ClassFileSet, Error};
use jsca::deps::DotFileSource;
use jsca::graph::{DependencyEdge, RelationKind};

fn jsca() -> Command {
    Command::cargo_bin("jsca").expect("binary exists")
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn sample_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_sample_classes(temp.path());
    temp
}

// ---------------------------------------------------------------------------
// Class reading
// ---------------------------------------------------------------------------

#[test]
fn test_reads_assembled_class() {
    let temp = sample_dir();
    let view = read_class_file(&temp.path().join("com/acme/Service.class")).unwrap();

    assert_eq!(view.name, "com/acme/Service");
    assert_eq!(view.super_name.as_deref(), Some("java/lang/Object"));
    assert_eq!(view.fields.len(), 1);
    assert_eq!(view.fields[0].descriptor, "Lcom/acme/Repository;");

    let handle = view.methods.iter().find(|m| m.name == "handle").unwrap();
    assert_eq!(handle.parameter_types().unwrap(), vec!["Lcom/acme/Request;"]);
    assert_eq!(handle.local_variables.len(), 2);
    assert!(handle.instructions.iter().any(|i| matches!(
        i,
        Instruction::Invoke { owner, name, .. } if owner == "com/acme/Repository" && name == "find"
    )));
}

#[test]
fn test_class_file_set_is_sorted() {
    let temp = sample_dir();
    let files = ClassFileSet::from_path_default(temp.path()).unwrap();
    let names: Vec<String> = read_class_files(&files)
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "com/acme/Entity",
            "com/acme/Repository",
            "com/acme/Request",
            "com/acme/Service"
        ]
    );
}

#[test]
fn test_malformed_class_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Broken.class");
    fs::write(&path, [0xCA, 0xFE, 0x00, 0x00]).unwrap();

    let err = read_class_file(&path).unwrap_err();
    match err {
        Error::Parse { path: p, .. } => assert_eq!(p, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_missing_directory() {
    let err = ClassFileSet::from_path_default("/nonexistent/classes").unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

// ---------------------------------------------------------------------------
// Library end to end
// ---------------------------------------------------------------------------

#[test]
fn test_coupling_end_to_end() {
    let temp = sample_dir();
    let config = Config::default();
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    let ctx = AnalysisContext::new(&files, &config, None);

    let analysis = CouplingAnalyzer::new().analyze(&ctx).unwrap();
    let scores = analysis.scores();
    assert_eq!(scores["com/acme/Service"], 2);
    assert_eq!(scores["com/acme/Repository"], 0);
    assert_eq!(scores["com/acme/Request"], 0);
    assert_eq!(scores["com/acme/Entity"], 0);

    let graph = &analysis.graph;
    assert_eq!(graph.edge_count_between("com/acme/Service", "com/acme/Repository"), 2);
    assert_eq!(graph.edge_count_between("com/acme/Service", "com/acme/Request"), 2);
    assert_eq!(graph.edge_count_by_kind(RelationKind::InstanceVariable), 1);
    assert_eq!(graph.edge_count_by_kind(RelationKind::CallsMethod), 1);
    assert_eq!(graph.edge_count_by_kind(RelationKind::LocalVariable), 1);
    assert_eq!(graph.edge_count_by_kind(RelationKind::ParameterType), 1);
    assert_eq!(graph.edge_count_by_kind(RelationKind::Superclass), 0);
    assert!(!graph.contains_vertex("java/lang/Object"));

    assert_eq!(analysis.pairs.len(), 6);
    let nonzero: Vec<_> = analysis.pairs.iter().filter(|p| p.score > 0).collect();
    assert_eq!(nonzero.len(), 2);
    assert!(nonzero.iter().all(|p| p.score == 2));
}

#[test]
fn test_coupling_reports_progress() {
    let temp = sample_dir();
    let config = Config::default();
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    let seen = std::cell::RefCell::new(Vec::new());
    let ctx = AnalysisContext::new(&files, &config, None)
        .with_progress(|current, total| seen.borrow_mut().push((current, total)));

    CouplingAnalyzer::new().analyze(&ctx).unwrap();
    assert_eq!(*seen.borrow(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
}

#[test]
fn test_superclass_relation_from_bytecode() {
    let temp = TempDir::new().unwrap();
    ClassSpec::new("com/acme/Base").write_to(temp.path());
    ClassSpec::new("com/acme/Derived")
        .extends("com/acme/Base")
        .write_to(temp.path());
    ClassSpec::new("com/acme/Outer$Inner")
        .extends("com/acme/Derived")
        .write_to(temp.path());

    let files = ClassFileSet::from_path_default(temp.path()).unwrap();
    let views = read_class_files(&files).unwrap();
    let graph = coupling::build_coupling_graph(&views).unwrap();

    assert_eq!(graph.edge_count_by_kind(RelationKind::Superclass), 2);
    assert_eq!(graph.edge_count_between("com/acme/Derived", "com/acme/Base"), 1);
    assert_eq!(graph.edge_count_between("com/acme/Outer_Inner", "com/acme/Derived"), 1);
}

#[test]
fn test_module_descriptor_is_skipped() {
    let temp = sample_dir();
    ClassSpec::new("module-info")
        .access(ACC_MODULE)
        .write_to(temp.path());

    let files = ClassFileSet::from_path_default(temp.path()).unwrap();
    let views = read_class_files(&files).unwrap();
    assert_eq!(views.len(), 5);

    let graph = coupling::build_coupling_graph(&views).unwrap();
    assert_eq!(graph.vertex_count(), 4);
    assert!(!graph.contains_vertex("module-info"));

    let scores = cohesion::compute_cohesion_scores(&views);
    assert!(!scores.contains_key("module-info"));
}

#[test]
fn test_excluded_classes_are_skipped() {
    let temp = sample_dir();
    let mut config = Config::default();
    config.exclude_patterns = vec!["**/Entity.class".to_string()];
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    assert_eq!(files.len(), 3);
}

#[test]
fn test_cohesion_end_to_end() {
    let temp = sample_dir();
    let config = Config::default();
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    let ctx = AnalysisContext::new(&files, &config, None);

    let analysis = CohesionAnalyzer::new().analyze(&ctx).unwrap();
    let scores = analysis.scores();
    // find and size share `items`; the constructor stands alone
    assert_eq!(scores["com/acme/Repository"], 2);
    // the constructor writes `repo`, handle reads it
    assert_eq!(scores["com/acme/Service"], 1);
    assert_eq!(scores["com/acme/Request"], 0);
    assert_eq!(scores["com/acme/Entity"], 0);
    assert_eq!(analysis.summary.max_lcom, 2);
    assert_eq!(analysis.classes[0].class, "com/acme/Repository");
}

#[test]
fn test_cohesion_same_class_calls_connect_methods() {
    let temp = TempDir::new().unwrap();
    ClassSpec::new("com/acme/Worker")
        .method(
            MethodSpec::new("run", "()V")
                .op(common::Op::Aload0)
                .op(common::invoke_virtual("com/acme/Worker", "step", "()V")),
        )
        .method(MethodSpec::new("step", "()V").op(common::Op::Return))
        .method(MethodSpec::new("step", "(I)V").op(common::Op::Return))
        .method(MethodSpec::new("idle", "()V").op(common::Op::Return))
        .write_to(temp.path());

    let files = ClassFileSet::from_path_default(temp.path()).unwrap();
    let views = read_class_files(&files).unwrap();
    let scores = cohesion::compute_cohesion_scores(&views);
    // {run, step} and {idle}
    assert_eq!(scores["com/acme/Worker"], 2);
}

#[test]
fn test_cycles_from_dot_file() {
    let temp = sample_dir();
    let config = Config::default();
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    let ctx = AnalysisContext::new(&files, &config, None);

    let analyzer = CyclesAnalyzer::new().with_source(DotFileSource::new(fixture("classes.dot")));
    let analysis = analyzer.analyze(&ctx).unwrap();

    assert!(analysis.has_cycles);
    assert_eq!(analysis.summary.total_classes, 5);
    assert_eq!(analysis.summary.total_dependencies, 6);
    assert_eq!(
        analysis.feedback_arc_set,
        vec![DependencyEdge::new("com.acme.Service", "com.acme.Repository")]
    );
}

#[test]
fn test_cycles_acyclic_dot_file() {
    let temp = sample_dir();
    let config = Config::default();
    let files = ClassFileSet::from_path(temp.path(), &config).unwrap();
    let ctx = AnalysisContext::new(&files, &config, None);

    let analyzer = CyclesAnalyzer::new()
        .with_source(DotFileSource::new(fixture("acyclic.dot")))
        .with_break_on_cycle(true);
    let analysis = analyzer.analyze(&ctx).unwrap();
    assert!(!analysis.has_cycles);
    assert!(analysis.feedback_arc_set.is_empty());
    assert!(analyzer.check_thresholds(&analysis).is_ok());
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    jsca()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("coupling"))
        .stdout(predicate::str::contains("cohesion"))
        .stdout(predicate::str::contains("cycles"));
}

#[test]
fn test_cli_coupling_json() {
    let temp = sample_dir();
    let output = jsca()
        .args(["-p", temp.path().to_str().unwrap(), "-f", "json", "coupling"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["total_classes"], 4);
    assert_eq!(value["summary"]["max_cbo"], 2);
    assert_eq!(value["classes"][0]["class"], "com/acme/Service");
}

#[test]
fn test_cli_all_json_is_one_document() {
    let temp = sample_dir();
    let output = jsca()
        .args(["-p", temp.path().to_str().unwrap(), "-f", "json", "all"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["coupling"]["summary"]["max_cbo"], 2);
    assert_eq!(value["cohesion"]["summary"]["max_lcom"], 2);
}

#[test]
fn test_cli_cbo_alias_text() {
    let temp = sample_dir();
    jsca()
        .args(["-p", temp.path().to_str().unwrap(), "cbo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max Cbo: 2"))
        .stdout(predicate::str::contains("com/acme/Service"));
}

#[test]
fn test_cli_cohesion_markdown() {
    let temp = sample_dir();
    jsca()
        .args(["-p", temp.path().to_str().unwrap(), "-f", "markdown", "lcom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Classes"))
        .stdout(predicate::str::contains("| com/acme/Repository |"));
}

#[test]
fn test_cli_cycles_with_dot() {
    jsca()
        .args(["-f", "json", "cycles", "--dot", &fixture("classes.dot")])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"has_cycles\": true"))
        .stdout(predicate::str::contains("com.acme.Service"));
}

#[test]
fn test_cli_cycles_missing_dot() {
    jsca()
        .args(["cycles", "--dot", "/nonexistent/classes.dot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_missing_path() {
    jsca()
        .args(["-p", "/nonexistent/classes", "coupling"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_malformed_class_fails() {
    let temp = sample_dir();
    fs::write(temp.path().join("Broken.class"), b"not a class").unwrap();
    jsca()
        .args(["-p", temp.path().to_str().unwrap(), "coupling"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Broken.class"));
}

#[test]
fn test_cli_writes_artifacts() {
    let temp = sample_dir();
    let out = TempDir::new().unwrap();
    jsca()
        .args([
            "-p",
            temp.path().to_str().unwrap(),
            "-o",
            out.path().to_str().unwrap(),
            "-f",
            "json",
            "all",
        ])
        .assert()
        .success();

    let cbo: Value = serde_json::from_str(
        &fs::read_to_string(out.path().join("sca-coupling-cbo-results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(cbo["com/acme/Service"], 2);

    let pairs: Value = serde_json::from_str(
        &fs::read_to_string(out.path().join("sca-coupling-pair-cbo-results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(pairs.as_array().unwrap().len(), 6);

    let lcom: Value = serde_json::from_str(
        &fs::read_to_string(out.path().join("sca-cohesion-results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(lcom["com/acme/Repository"], 2);

    assert!(out.path().join("coupling_graph.dot").is_file());
    assert!(out.path().join("com_acme_Service_lcom_graph.dot").is_file());
}

#[test]
fn test_cli_cycles_artifacts() {
    let out = TempDir::new().unwrap();
    jsca()
        .args([
            "-o",
            out.path().to_str().unwrap(),
            "cycles",
            "--dot",
            &fixture("classes.dot"),
        ])
        .assert()
        .success();

    let arcs: Value = serde_json::from_str(
        &fs::read_to_string(out.path().join("sca-cycles-results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        arcs,
        serde_json::json!([["com.acme.Service", "com.acme.Repository"]])
    );
    let dot = fs::read_to_string(out.path().join("dependency_graph.dot")).unwrap();
    assert!(dot.contains("\"com.acme.Service\" -> \"com.acme.Repository\" [color=\"red\""));
}

#[test]
fn test_cli_cbo_threshold_fails_after_printing() {
    let temp = sample_dir();
    fs::write(temp.path().join("jsca.toml"), "[coupling]\nbreak_on_cbo = 1\n").unwrap();
    jsca()
        .args(["-p", temp.path().to_str().unwrap(), "coupling"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("com/acme/Service"))
        .stderr(predicate::str::contains("exceeds threshold"));
}

#[test]
fn test_cli_threshold_within_limit_passes() {
    let temp = sample_dir();
    fs::write(temp.path().join("jsca.toml"), "[coupling]\nbreak_on_cbo = 2\n").unwrap();
    jsca()
        .args(["-p", temp.path().to_str().unwrap(), "coupling"])
        .assert()
        .success();
}

#[test]
fn test_cli_lcom_threshold_from_explicit_config() {
    let temp = sample_dir();
    let cfg = TempDir::new().unwrap();
    let cfg_path = cfg.path().join("ci.toml");
    fs::write(&cfg_path, "[cohesion]\nbreak_on_lcom = 1\n").unwrap();
    jsca()
        .args([
            "-p",
            temp.path().to_str().unwrap(),
            "-c",
            cfg_path.to_str().unwrap(),
            "cohesion",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LCOM 2"));
}

#[test]
fn test_cli_cycle_threshold() {
    let cfg = TempDir::new().unwrap();
    let cfg_path = cfg.path().join("ci.toml");
    fs::write(&cfg_path, "[cycles]\nbreak_on_cycle = true\n").unwrap();
    jsca()
        .args([
            "-c",
            cfg_path.to_str().unwrap(),
            "cycles",
            "--dot",
            &fixture("classes.dot"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycles"));
}

#[test]
fn test_cli_missing_explicit_config() {
    let temp = sample_dir();
    jsca()
        .args([
            "-p",
            temp.path().to_str().unwrap(),
            "-c",
            "/nonexistent/jsca.toml",
            "coupling",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
