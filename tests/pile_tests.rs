//! Pile assembly integration tests
//!
//! Scenario tests write small piles into temporary directories; the larger
//! catalog chain lives under tests/fixtures/pile.

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xsdpile::{Error, SchemaPile};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("pile");
    path
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).display().to_string()
}

fn write_schema(dir: &Path, name: &str, tns: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(
            r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="{}"/>"#,
            tns
        ),
    )
    .unwrap();
    path
}

fn write_catalog(dir: &Path, name: &str, entries: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(
            r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">{}</catalog>"#,
            entries
        ),
    )
    .unwrap();
    path
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

/// Namespace to relative document path, for comparing whole tables
fn table(pile: &SchemaPile) -> Vec<(String, String)> {
    pile.all_schema_documents()
        .into_iter()
        .map(|doc| {
            let rel = pile
                .document_relative_path(doc)
                .map(|p| p.display().to_string().replace('\\', "/"))
                .unwrap_or_default();
            (doc.target_namespace().to_string(), rel)
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_schema_argument() {
    let dir = TempDir::new().unwrap();
    let a = write_schema(dir.path(), "a.xsd", "urn:x");

    let pile = SchemaPile::new(&[arg(&a)]).unwrap();
    assert_eq!(table(&pile), vec![("urn:x".to_string(), "a.xsd".to_string())]);
    assert!(pile.initial_catalogs().is_empty());
    assert!(pile.warnings().is_empty());
    assert!(pile.assembled_model().messages().is_empty());
}

#[test]
fn test_namespace_resolved_through_catalog() {
    let dir = TempDir::new().unwrap();
    let a = write_schema(dir.path(), "a.xsd", "urn:x");
    let cat = write_catalog(dir.path(), "cat.xml", r#"<uri name="urn:x" uri="./a.xsd"/>"#);

    let pile = SchemaPile::new(&["urn:x".to_string(), arg(&cat)]).unwrap();
    let expected = url::Url::from_file_path(std::fs::canonicalize(&a).unwrap()).unwrap();
    assert_eq!(pile.initial_schema_documents(), &[expected]);
    assert_eq!(pile.initial_namespace_uris(), &["urn:x".to_string()]);
    assert_eq!(pile.initial_catalogs().len(), 1);
}

#[test]
fn test_resolved_namespace_mismatch() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "a.xsd", "urn:y");
    let cat = write_catalog(dir.path(), "cat.xml", r#"<uri name="urn:x" uri="./a.xsd"/>"#);

    let err = SchemaPile::new(&["urn:x".to_string(), arg(&cat)]).unwrap_err();
    assert!(err.is_config());
    let message = err.to_string();
    assert!(message.contains("urn:x"), "{}", message);
    assert!(message.contains("urn:y"), "{}", message);
}

#[test]
fn test_namespace_without_catalogs() {
    let err = SchemaPile::new(&["urn:z"]).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("urn:z"));
    assert!(err.to_string().contains("no mapping"));
}

#[test]
fn test_remote_mapping_names_target() {
    let dir = TempDir::new().unwrap();
    let cat = write_catalog(
        dir.path(),
        "cat.xml",
        r#"<uri name="urn:x" uri="https://example.com/x.xsd"/>"#,
    );

    let err = SchemaPile::new(&[arg(&cat), "urn:x".to_string()]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("urn:x"));
    assert!(message.contains("https://example.com/x.xsd"));
}

#[test]
fn test_hosted_file_uri_fails_before_io() {
    // The other argument does not exist; the host check must fire first
    let err = SchemaPile::new(&["/no/such/file.xsd", "file://server/share/a.xsd"]).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("server"));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = SchemaPile::new(&["/no/such/file.xsd"]).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_file_uri_argument() {
    let dir = TempDir::new().unwrap();
    let a = write_schema(dir.path(), "a b.xsd", "urn:x");
    let uri = url::Url::from_file_path(std::fs::canonicalize(&a).unwrap()).unwrap();

    let pile = SchemaPile::new(&[uri.to_string()]).unwrap();
    assert_eq!(pile.namespace_uris(), vec!["urn:x"]);
    assert_eq!(table(&pile), vec![("urn:x".to_string(), "a b.xsd".to_string())]);
}

#[test]
fn test_assembly_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    write_schema(dir.path(), "sub/b.xsd", "urn:b");
    let cat = write_catalog(dir.path(), "cat.xml", r#"<uri name="urn:b" uri="sub/b.xsd"/>"#);
    let a = dir.path().join("a.xsd");
    std::fs::write(
        &a,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
  <xs:import namespace="urn:b"/>
</xs:schema>"#,
    )
    .unwrap();

    let args = [arg(&a), arg(&cat)];
    let first = SchemaPile::new(&args).unwrap();
    let second = SchemaPile::new(&args).unwrap();
    assert_eq!(table(&first), table(&second));
    assert_eq!(first.pile_root(), second.pile_root());
    assert_eq!(
        table(&first),
        vec![
            ("urn:a".to_string(), "a.xsd".to_string()),
            ("urn:b".to_string(), "sub/b.xsd".to_string()),
        ]
    );
}

// ============================================================================
// Fixture pile
// ============================================================================

#[test]
fn test_fixture_pile() {
    let pile = SchemaPile::new(&[fixture("catalog.xml"), "urn:example:ext".to_string()]).unwrap();

    assert_eq!(
        table(&pile),
        vec![
            ("urn:example:ext".to_string(), "ext/ext.xsd".to_string()),
            ("urn:example:core".to_string(), "core/core.xsd".to_string()),
        ]
    );
    assert_eq!(
        pile.pile_root(),
        Some(std::fs::canonicalize(fixtures_dir()).unwrap().as_path())
    );

    // core.xsd includes core-types.xsd
    assert_eq!(pile.warnings().len(), 1);
    assert!(pile.warnings()[0].contains("urn:example:core"));
    assert!(pile.assembled_model().messages().is_empty());

    let core = pile.schema_document("urn:example:core").unwrap();
    assert_eq!(core.version(), "1.0");
    assert_eq!(core.documentation()[0].text, "Core components.");
    assert_eq!(core.documentation()[0].lang.as_deref(), Some("en-US"));
    assert_eq!(core.prefix_for("urn:example:core"), Some("core"));

    let ext = pile.schema_document("urn:example:ext").unwrap();
    assert_eq!(ext.imports().len(), 1);
    assert_eq!(ext.imports()[0].namespace.as_deref(), Some("urn:example:core"));
    assert_eq!(ext.imports()[0].line, 7);
}

#[test]
fn test_fixture_catalog_closure() {
    let pile = SchemaPile::new(&[fixture("catalog.xml"), "urn:example:core".to_string()]).unwrap();

    let files: Vec<String> = pile
        .all_catalog_files()
        .iter()
        .filter_map(|u| pile.relative_path(u))
        .map(|p| p.display().to_string().replace('\\', "/"))
        .collect();
    assert_eq!(files, vec!["catalog.xml", "ext/catalog.xml", "broken/catalog.xml"]);

    let messages = pile.all_catalog_validation_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("broken/catalog.xml"));
}

#[test]
fn test_resolver_shared_after_assembly() {
    let pile = SchemaPile::new(&[fixture("catalog.xml")]).unwrap();
    let resolver = std::sync::Arc::clone(pile.resolver());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = std::sync::Arc::clone(&resolver);
            std::thread::spawn(move || resolver.resolve_uri("urn:example:ext"))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results[0].is_some());
    assert!(results.iter().all(|r| r == &results[0]));
}
