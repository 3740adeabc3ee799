use std::path::PathBuf;

use config::Config;
use ir::DescriptorSet;
use pipeline::{generate_all, run, Pipeline, PipelineError};
use tempfile::TempDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/library.descriptors.json")
}

fn descriptors() -> DescriptorSet { DescriptorSet::from_file(&fixture_path()).expect("fixture loads") }

#[test]
fn run_writes_one_unit_per_bound_file() {
    let out = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.codegen.descriptors = fixture_path();
    config.codegen.output_dir = out.path().join("gen");

    let report = run(&config).expect("run succeeds");
    assert!(report.is_success());
    assert_eq!(
        report.written,
        vec![
            out.path().join("gen/library/v1/library.pb.gw.rs"),
            out.path().join("gen/helloworld/helloworld.pb.gw.rs"),
        ]
    );
    assert_eq!(report.skipped, vec!["internal/health.proto".to_string()]);
    for path in &report.written {
        let text = std::fs::read_to_string(path).expect("unit readable");
        assert!(text.starts_with("// Code generated by protoc-gen-triple-gateway-rs. DO NOT EDIT."));
    }
}

#[test]
fn duplicate_binding_aborts_only_its_file() {
    let mut files = descriptors().files().to_vec();
    let library = files.iter_mut().find(|f| f.name == "library/v1/library.proto").expect("library");
    let duplicate = library.services[0].methods[4].bindings[0].clone();
    library.services[0].methods[0].bindings.push(duplicate);
    let set = DescriptorSet::new(files);

    let out = TempDir::new().expect("tempdir");
    let report = generate_all(&Pipeline::default(), &set, out.path()).expect("run continues");
    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file, "library/v1/library.proto");
    assert!(report.failures[0].to_string().starts_with("library/v1/library.proto: "));
    assert_eq!(report.written, vec![out.path().join("helloworld/helloworld.pb.gw.rs")]);
    assert!(!out.path().join("library/v1/library.pb.gw.rs").exists());
}

#[test]
fn targets_restrict_the_run() {
    let out = TempDir::new().expect("tempdir");
    let pipeline = Pipeline::default().with_targets(vec!["helloworld/helloworld.proto".into()]);
    let report = generate_all(&pipeline, &descriptors(), out.path()).expect("run");
    assert_eq!(report.written.len(), 1);
    assert!(report.skipped.is_empty());
    assert_eq!(report.to_string(), "1 written, 0 skipped, 0 failed");
}

#[test]
fn config_options_reach_generated_code() {
    let out = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.codegen.descriptors = fixture_path();
    config.codegen.output_dir = out.path().to_path_buf();
    config.codegen.targets = vec!["library/v1/library.proto".into()];
    config.gateway.register_fn_suffix = "gateway".into();
    config.gateway.repeated_path_param_separator = registry::Separator::Pipes;

    let report = run(&config).expect("run");
    let text = std::fs::read_to_string(&report.written[0]).expect("unit");
    assert!(text.contains("register_library_gateway_client"));
    assert!(text.contains("\"|\""));
}

#[test]
fn missing_descriptor_file_is_fatal() {
    let out = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.codegen.descriptors = out.path().join("absent.json");
    config.codegen.output_dir = out.path().join("gen");

    assert!(matches!(run(&config), Err(PipelineError::Descriptors(_))));
    assert!(!out.path().join("gen").exists());
}
