//! Unit tests for plugin discovery, using shell-script plugins.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}

/// Installs a plugin in the expected layout: `<root>/<name>/<name>`.
fn install_plugin(root: &Path, name: &str, body: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir(&dir).expect("mkdir");
    let path = dir.join(name);
    write_script(&path, body);
    path
}

#[test]
fn probe_reads_the_metadata_line() {
    let dir = TempDir::new().expect("tempdir");
    let path = install_plugin(
        dir.path(),
        "csv_reader",
        r#"echo '{"name":"CSV Reader","patterns":[{"description":"CSV files","patterns":["*.csv"]}]}'"#,
    );

    let descriptor = Discovery::new().probe(&path).expect("probe succeeds");
    assert_eq!(descriptor.name(), "CSV Reader");
    assert_eq!(descriptor.executable(), path.as_path());
    assert_eq!(descriptor.patterns().len(), 1);
    assert_eq!(descriptor.patterns()[0].patterns, vec!["*.csv".to_owned()]);
}

#[test]
fn probe_falls_back_to_a_title_cased_file_stem() {
    let dir = TempDir::new().expect("tempdir");
    let path = install_plugin(dir.path(), "model_selector", r#"echo '{"patterns":[]}'"#);

    let descriptor = Discovery::new().probe(&path).expect("probe succeeds");
    assert_eq!(descriptor.name(), "Model Selector");
}

#[test]
fn probe_rejects_invalid_metadata() {
    let dir = TempDir::new().expect("tempdir");
    let path = install_plugin(dir.path(), "broken", "echo 'not json'");

    let err = Discovery::new().probe(&path).expect_err("invalid metadata");
    assert!(matches!(err, HostError::ProbeFailed { .. }));
    assert!(err.to_string().contains("invalid metadata"));
}

#[test]
fn probe_rejects_a_silent_candidate() {
    let dir = TempDir::new().expect("tempdir");
    let path = install_plugin(dir.path(), "silent", "sleep 10");

    let discovery = Discovery::new().with_probe_timeout(Duration::from_millis(200));
    let err = discovery.probe(&path).expect_err("silent candidate");
    assert!(err.to_string().contains("no metadata"));
}

#[test]
fn scan_accepts_only_same_named_executables_in_subdirectories() {
    let dir = TempDir::new().expect("tempdir");
    install_plugin(
        dir.path(),
        "good",
        r#"echo '{"name":"Good","patterns":[]}'"#,
    );
    // An executable at the top level is not a plugin.
    write_script(&dir.path().join("stray"), r#"echo '{"name":"Stray"}'"#);
    // A subdirectory without a same-named executable is skipped.
    let misnamed = dir.path().join("misnamed");
    std::fs::create_dir(&misnamed).expect("mkdir");
    write_script(&misnamed.join("other"), r#"echo '{"name":"Other"}'"#);

    let found = Discovery::new().scan_dir(dir.path());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Good");
}

#[test]
fn scan_skips_candidates_that_fail_the_probe() {
    let dir = TempDir::new().expect("tempdir");
    install_plugin(
        dir.path(),
        "a_good_plugin",
        r#"echo '{"name":"Good","patterns":[]}'"#,
    );
    install_plugin(dir.path(), "b_broken_plugin", "exit 1");

    let found = Discovery::new()
        .with_probe_timeout(Duration::from_secs(1))
        .scan_dir(dir.path());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Good");
}

#[test]
fn scan_of_a_missing_directory_is_empty() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nonexistent");
    assert!(Discovery::new().scan_dir(&missing).is_empty());
}

#[test]
fn scan_dirs_preserves_directory_order() {
    let first = TempDir::new().expect("tempdir");
    let second = TempDir::new().expect("tempdir");
    install_plugin(first.path(), "one", r#"echo '{"name":"One","patterns":[]}'"#);
    install_plugin(second.path(), "two", r#"echo '{"name":"Two","patterns":[]}'"#);

    let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
    let found = Discovery::new().scan_dirs(&dirs);
    let names: Vec<&str> = found.iter().map(PluginDescriptor::name).collect();
    assert_eq!(names, vec!["One", "Two"]);
}
