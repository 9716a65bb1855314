//! CLI integration tests
//!
//! These tests run the built binary against the fixture pile.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn xsdpile_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xsdpile"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("pile");
    path
}

#[test]
fn test_cli_summary() {
    let output = Command::new(xsdpile_bin())
        .args([
            fixtures_dir().join("catalog.xml").to_str().unwrap(),
            "urn:example:ext",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "assembly should succeed");
    assert!(stdout.contains("=== Namespaces ==="));
    assert!(stdout.contains("urn:example:core -> core/core.xsd (version 1.0)"));
    assert!(stdout.contains("urn:example:ext -> ext/ext.xsd (version 2.1)"));
    assert!(stdout.contains("=== Warnings ==="));
    assert!(!stdout.contains("=== Catalog Files ==="));
}

#[test]
fn test_cli_json_with_catalogs() {
    let output = Command::new(xsdpile_bin())
        .args([
            "--json",
            "--catalogs",
            fixtures_dir().join("catalog.xml").to_str().unwrap(),
            "urn:example:core",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["initialNamespaceURIs"][0], "urn:example:core");
    assert_eq!(
        report["namespaces"]["urn:example:core"]["document"],
        "core/core.xsd"
    );
    assert_eq!(report["catalogFiles"].as_array().unwrap().len(), 3);
    assert_eq!(report["catalogProblems"].as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_unresolved_namespace_fails() {
    let output = Command::new(xsdpile_bin())
        .args(["urn:nowhere"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("urn:nowhere"));
}
