//! Document identification
//!
//! Decides what a local file is by looking at its root element only. The
//! file is streamed and reading stops at the first start tag, so probing a
//! large schema costs no more than probing a small one.

use crate::error::{ConfigError, Error, Result};
use crate::{CATALOG_NAMESPACE, XSD_NAMESPACE};
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::path::Path;

/// What kind of document a file holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// OASIS XML Catalog
    Catalog,
    /// XML Schema document with its `targetNamespace` (empty if absent)
    Schema {
        /// Declared target namespace
        target_namespace: String,
    },
    /// Something else; carries the root element's namespace, if any
    Neither {
        /// Namespace of the root element
        root_namespace: Option<String>,
    },
}

impl DocumentKind {
    /// Target namespace for schema documents
    pub fn target_namespace(&self) -> Option<&str> {
        match self {
            DocumentKind::Schema { target_namespace } => Some(target_namespace),
            _ => None,
        }
    }
}

/// Identify a local file by the namespace of its root element
///
/// Any read or well-formedness failure before the root start tag is a
/// configuration error naming the file.
pub fn identify(path: &Path) -> Result<DocumentKind> {
    probe(path).map_err(|e| match e {
        Error::Config(c) => Error::Config(c),
        other => ConfigError::new(format!("cannot identify document: {}", other))
            .with_argument(path.display().to_string())
            .into(),
    })
}

fn probe(path: &Path) -> Result<DocumentKind> {
    let mut reader = NsReader::from_file(path)?;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let (start, event_kind) = match event {
            Event::Start(e) => (e, RootTag::Start),
            Event::Empty(e) => (e, RootTag::Empty),
            Event::Eof => {
                return Err(ConfigError::new("document has no root element")
                    .with_argument(path.display().to_string())
                    .into())
            }
            _ => continue,
        };

        if !is_xml_name(start.name().as_ref()) {
            return Err(Error::Xml(format!(
                "invalid root element name '{}'",
                String::from_utf8_lossy(start.name().as_ref())
            )));
        }
        let has_content = matches!(event_kind, RootTag::Start);

        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(Error::Xml(format!(
                    "root element uses undeclared prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )))
            }
        };

        let kind = match namespace.as_deref() {
            Some(CATALOG_NAMESPACE) => DocumentKind::Catalog,
            Some(XSD_NAMESPACE) => {
                let mut target_namespace = String::new();
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
                    if attr.key.as_ref() == b"targetNamespace" {
                        target_namespace = attr.unescape_value()?.into_owned();
                    }
                }
                DocumentKind::Schema { target_namespace }
            }
            _ => DocumentKind::Neither {
                root_namespace: namespace,
            },
        };

        if has_content {
            check_root_closed(&mut reader)?;
        }
        return Ok(kind);
    }
}

enum RootTag {
    Start,
    Empty,
}

/// A `<root ...>` start tag must be followed by something before EOF
///
/// An unterminated start tag is handed out as a start event at EOF, so the
/// next markup event tells the two apart.
fn check_root_closed<R: std::io::BufRead>(reader: &mut NsReader<R>) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(_) | Event::Comment(_) | Event::PI(_) => continue,
            Event::Eof => {
                return Err(Error::Xml(
                    "root element is not closed before end of file".to_string(),
                ))
            }
            _ => return Ok(()),
        }
    }
}

/// XML `Name` production, restricted to what a root element needs
fn is_xml_name(name: &[u8]) -> bool {
    let Ok(name) = std::str::from_utf8(name) else {
        return false;
    };
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{B7}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_identify_schema() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "a.xsd",
            r#"<?xml version="1.0"?>
<!-- leading comment -->
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x"/>"#,
        );
        assert_eq!(
            identify(&path).unwrap(),
            DocumentKind::Schema {
                target_namespace: "urn:x".to_string()
            }
        );
    }

    #[test]
    fn test_identify_schema_without_target_namespace() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "none.xsd",
            r#"<schema xmlns="http://www.w3.org/2001/XMLSchema"><element name="a"/></schema>"#,
        );
        let kind = identify(&path).unwrap();
        assert_eq!(kind.target_namespace(), Some(""));
    }

    #[test]
    fn test_identify_catalog() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "catalog.xml",
            r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog"/>"#,
        );
        assert_eq!(identify(&path).unwrap(), DocumentKind::Catalog);
    }

    #[test]
    fn test_identify_neither() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "doc.xml", r#"<doc xmlns="urn:other"><a/></doc>"#);
        assert_eq!(
            identify(&path).unwrap(),
            DocumentKind::Neither {
                root_namespace: Some("urn:other".to_string())
            }
        );
    }

    #[test]
    fn test_only_root_is_read() {
        let dir = TempDir::new().unwrap();
        // Broken after the root start tag; probing must still succeed
        let path = write(
            &dir,
            "broken.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b"><oops></xs:schema>"#,
        );
        assert!(matches!(identify(&path).unwrap(), DocumentKind::Schema { .. }));
    }

    #[test]
    fn test_unreadable_and_malformed_are_config_errors() {
        let dir = TempDir::new().unwrap();
        let err = identify(&dir.path().join("missing.xsd")).unwrap_err();
        assert!(err.is_config());

        let path = write(&dir, "bad.xml", "<<not xml");
        let err = identify(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("bad.xml"));
    }

    #[test]
    fn test_unterminated_root_tag_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "cut.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x""#,
        );
        let err = identify(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("cut.xsd"));

        let path = write(&dir, "open.xml", r#"<doc xmlns="urn:other">"#);
        assert!(identify(&path).unwrap_err().is_config());
    }

    #[test]
    fn test_xml_name() {
        assert!(is_xml_name(b"xs:schema"));
        assert!(is_xml_name(b"_a-b.c"));
        assert!(!is_xml_name(b"<not"));
        assert!(!is_xml_name(b"1abc"));
        assert!(!is_xml_name(b""));
    }
}
