//! Conformance tests that run YAML fixtures against strata
//!
//! Run with: cargo test -p strata-test --test conformance

#![cfg(feature = "fixtures")]

use std::fs;
use std::path::{Path, PathBuf};
use strata_test::fixture::Fixture;

/// The `conformance/` directory at the workspace root.
fn fixtures_dir() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    // ext/test -> ext -> workspace root
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .expect("could not find workspace root")
        .join("conformance")
}

/// Load and run all fixtures in a directory.
fn run_fixtures_in_dir(dir: &Path) {
    assert!(dir.exists(), "fixtures directory does not exist: {}", dir.display());

    let mut paths: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no fixtures in {}", dir.display());

    for path in paths {
        println!("Running fixture file: {}", path.display());
        let yaml = fs::read_to_string(&path).expect("read yaml");
        let fixtures = Fixture::from_yaml_multi(&yaml)
            .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()));

        for fixture in fixtures {
            println!("  Running: {}", fixture.name);
            fixture.run_and_assert();
        }
    }
}

#[test]
fn test_occurrence() {
    run_fixtures_in_dir(&fixtures_dir().join("01_occurrence"));
}

#[test]
fn test_groups() {
    run_fixtures_in_dir(&fixtures_dir().join("02_groups"));
}

#[test]
fn test_targets() {
    run_fixtures_in_dir(&fixtures_dir().join("03_targets"));
}

#[test]
fn test_errors() {
    run_fixtures_in_dir(&fixtures_dir().join("04_errors"));
}
