//! Schema document inspection
//!
//! A schema loader knows which documents belong to a pile but not how each
//! document was written: its prefix declarations, its `version` attribute,
//! its top-level documentation. [`SchemaInspector`] answers those questions
//! for one parsed document; [`SchemaDocument`] is the owned record built
//! from its answers.

use roxmltree::{Node, ParsingOptions};
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::url_to_path;
use crate::namespaces::{collect_declarations, NamespaceDeclaration, QName};
use crate::{XML_NAMESPACE, XSD_NAMESPACE};

/// A top-level `xs:import`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    /// Imported namespace, absent for a no-namespace import
    pub namespace: Option<String>,
    /// Location hint, if given
    pub schema_location: Option<String>,
    /// 1-based source line
    pub line: u32,
}

/// One top-level `xs:documentation` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Documentation {
    /// Trimmed text content
    pub text: String,
    /// Effective `xml:lang`, inherited from ancestors when not set locally
    pub lang: Option<String>,
}

/// Point queries over one parsed schema document
pub struct SchemaInspector<'a, 'input> {
    root: Node<'a, 'input>,
}

impl<'a, 'input> SchemaInspector<'a, 'input> {
    /// Wrap a parsed document whose root must be `xs:schema`
    pub fn new(doc: &'a roxmltree::Document<'input>) -> Result<Self> {
        let root = doc.root_element();
        if root.tag_name().namespace() != Some(XSD_NAMESPACE) || root.tag_name().name() != "schema" {
            return Err(Error::Xml(format!(
                "expected xs:schema root element, got {}",
                root.tag_name().name()
            )));
        }
        Ok(Self { root })
    }

    /// Qualified name of the root element
    pub fn root_name(&self) -> QName {
        QName::new(self.root.tag_name().namespace(), self.root.tag_name().name())
    }

    /// Attributes of the root element, namespace-qualified, in source order
    pub fn root_attributes(&self) -> Vec<(QName, String)> {
        self.root
            .attributes()
            .map(|a| (QName::new(a.namespace(), a.name()), a.value().to_string()))
            .collect()
    }

    /// `targetNamespace`, empty when absent
    pub fn target_namespace(&self) -> &str {
        self.root.attribute("targetNamespace").unwrap_or("")
    }

    /// `version` attribute of the root, empty when absent
    pub fn version(&self) -> &str {
        self.root.attribute("version").unwrap_or("")
    }

    /// Top-level `xs:import` elements
    pub fn imports(&self) -> Vec<ImportStatement> {
        self.select(&["import"])
            .into_iter()
            .map(|n| ImportStatement {
                namespace: n.attribute("namespace").map(str::to_string),
                schema_location: n.attribute("schemaLocation").map(str::to_string),
                line: line_of(&n),
            })
            .collect()
    }

    /// `xs:schema/xs:annotation/xs:documentation` strings with their language
    pub fn documentation(&self) -> Vec<Documentation> {
        self.select(&["annotation", "documentation"])
            .into_iter()
            .map(|n| Documentation {
                text: text_content(&n).trim().to_string(),
                lang: effective_lang(&n),
            })
            .collect()
    }

    /// Follow a child path of XSD-namespace local names from the root
    pub fn select(&self, path: &[&str]) -> Vec<Node<'a, 'input>> {
        let mut current = vec![self.root];
        for step in path {
            current = current
                .iter()
                .flat_map(|n| n.children())
                .filter(|c| {
                    c.is_element()
                        && c.tag_name().namespace() == Some(XSD_NAMESPACE)
                        && c.tag_name().name() == *step
                })
                .collect();
        }
        current
    }
}

/// Everything known about one schema document in a pile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDocument {
    url: Url,
    root: QName,
    root_attributes: Vec<(QName, String)>,
    target_namespace: String,
    version: String,
    declarations: Vec<NamespaceDeclaration>,
    imports: Vec<ImportStatement>,
    documentation: Vec<Documentation>,
}

impl SchemaDocument {
    /// Read and inspect the schema document at a local `file:` URL
    pub fn open(url: &Url, limits: &Limits) -> Result<Self> {
        let path = url_to_path(url)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Resource(format!("failed to read schema '{}': {}", path.display(), e))
        })?;
        limits.check_document_size(content.len())?;
        Self::parse(url.clone(), &content)
    }

    /// Inspect schema document text located at `url`
    pub fn parse(url: Url, xml: &str) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(xml, options)?;
        let inspector = SchemaInspector::new(&doc)?;

        Ok(Self {
            root: inspector.root_name(),
            root_attributes: inspector.root_attributes(),
            target_namespace: inspector.target_namespace().to_string(),
            version: inspector.version().to_string(),
            declarations: collect_declarations(xml)?,
            imports: inspector.imports(),
            documentation: inspector.documentation(),
            url,
        })
    }

    /// Location of the document
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Root element name (always `xs:schema`)
    pub fn root(&self) -> &QName {
        &self.root
    }

    /// Root element attributes
    pub fn root_attributes(&self) -> &[(QName, String)] {
        &self.root_attributes
    }

    /// Target namespace, empty when the document declares none
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// Declared schema version, empty when absent
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Every namespace declaration, sorted by depth then line
    pub fn namespace_declarations(&self) -> &[NamespaceDeclaration] {
        &self.declarations
    }

    /// Top-level import statements
    pub fn imports(&self) -> &[ImportStatement] {
        &self.imports
    }

    /// Top-level documentation strings
    pub fn documentation(&self) -> &[Documentation] {
        &self.documentation
    }

    /// Prefix the root element binds to a namespace URI
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.root_declarations()
            .find(|d| d.uri == uri)
            .map(|d| d.prefix.as_str())
    }

    /// Namespace URI the root element binds to a prefix
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.root_declarations()
            .find(|d| d.prefix == prefix)
            .map(|d| d.uri.as_str())
    }

    fn root_declarations(&self) -> impl Iterator<Item = &NamespaceDeclaration> {
        self.declarations.iter().take_while(|d| d.depth == 0)
    }
}

fn text_content(node: &Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn effective_lang(node: &Node) -> Option<String> {
    node.ancestors()
        .filter(|n| n.is_element())
        .find_map(|n| n.attribute((XML_NAMESPACE, "lang")))
        .map(str::to_string)
}

fn line_of(node: &Node) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:nc="urn:niem-core"
           xmlns="urn:example"
           targetNamespace="urn:example"
           version="5.0"
           xml:lang="en-US">
  <xs:annotation>
    <xs:documentation>Example <b xmlns="">schema</b> for tests.</xs:documentation>
    <xs:documentation xml:lang="fr">Exemple.</xs:documentation>
  </xs:annotation>
  <xs:import namespace="urn:niem-core" schemaLocation="niem-core.xsd"/>
  <xs:import namespace="urn:no-location"/>
  <xs:complexType name="T">
    <xs:annotation xmlns:local="urn:local">
      <xs:documentation>Not top level.</xs:documentation>
    </xs:annotation>
  </xs:complexType>
</xs:schema>"#;

    fn document() -> SchemaDocument {
        SchemaDocument::parse(Url::parse("file:///pile/example.xsd").unwrap(), SCHEMA).unwrap()
    }

    #[test]
    fn test_basic_queries() {
        let doc = document();
        assert_eq!(doc.target_namespace(), "urn:example");
        assert_eq!(doc.version(), "5.0");
        assert!(doc.root().is(XSD_NAMESPACE, "schema"));
        assert!(doc
            .root_attributes()
            .iter()
            .any(|(q, v)| q.local_name == "lang" && v == "en-US"));
    }

    #[test]
    fn test_imports() {
        let doc = document();
        assert_eq!(
            doc.imports(),
            &[
                ImportStatement {
                    namespace: Some("urn:niem-core".to_string()),
                    schema_location: Some("niem-core.xsd".to_string()),
                    line: 12,
                },
                ImportStatement {
                    namespace: Some("urn:no-location".to_string()),
                    schema_location: None,
                    line: 13,
                },
            ]
        );
    }

    #[test]
    fn test_documentation_language_inheritance() {
        let doc = document();
        assert_eq!(
            doc.documentation(),
            &[
                Documentation {
                    text: "Example schema for tests.".to_string(),
                    lang: Some("en-US".to_string()),
                },
                Documentation {
                    text: "Exemple.".to_string(),
                    lang: Some("fr".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_namespace_declarations() {
        let doc = document();
        let decls = doc.namespace_declarations();
        assert_eq!(decls.len(), 5);
        assert_eq!(decls[0].prefix, "xs");
        assert_eq!(decls[3].prefix, "local");
        assert_eq!(decls[3].depth, 2);
        // xmlns="" undeclaration inside the documentation text
        assert_eq!((decls[4].prefix.as_str(), decls[4].depth), ("", 3));

        assert_eq!(doc.prefix_for("urn:niem-core"), Some("nc"));
        assert_eq!(doc.uri_for(""), Some("urn:example"));
        assert_eq!(doc.uri_for("local"), None);
    }

    #[test]
    fn test_missing_target_namespace_is_empty() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#;
        let doc = SchemaDocument::parse(Url::parse("file:///a.xsd").unwrap(), xml).unwrap();
        assert_eq!(doc.target_namespace(), "");
        assert_eq!(doc.version(), "");
        assert!(doc.documentation().is_empty());
    }

    #[test]
    fn test_non_schema_rejected() {
        let xml = r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog"/>"#;
        assert!(SchemaDocument::parse(Url::parse("file:///c.xml").unwrap(), xml).is_err());
    }
}
