//! XML namespace handling
//!
//! Qualified names, plus recovery of the namespace-prefix declarations a
//! document makes. Declarations are not kept on a parsed tree, so they are
//! collected by a streaming pass over the raw text.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Check namespace and local name at once
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// One `xmlns` / `xmlns:prefix` attribute found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceDeclaration {
    /// Declared prefix, empty for the default namespace
    pub prefix: String,
    /// Namespace URI bound to the prefix
    pub uri: String,
    /// 1-based line of the start tag carrying the declaration
    pub line: u32,
    /// Element nesting depth, the root element being 0
    pub depth: usize,
}

/// Collect every namespace declaration in a document
///
/// Declarations are gathered in element-entry order and then stably sorted
/// by depth and line, so root declarations come first in source order.
pub fn collect_declarations(xml: &str) -> Result<Vec<NamespaceDeclaration>> {
    let mut reader = Reader::from_str(xml);
    let mut lines = LineTracker::new(xml);
    let mut decls = Vec::new();
    let mut depth = 0usize;

    loop {
        let tag_start = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let line = lines.line_at(tag_start);
                push_declarations(&e, line, depth, &mut decls)?;
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                let line = lines.line_at(tag_start);
                push_declarations(&e, line, depth, &mut decls)?;
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "error scanning namespace declarations at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    decls.sort_by_key(|d| (d.depth, d.line));
    Ok(decls)
}

fn push_declarations(
    start: &BytesStart,
    line: u32,
    depth: usize,
    out: &mut Vec<NamespaceDeclaration>,
) -> Result<()> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?;

        let prefix = if key == "xmlns" {
            ""
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            prefix
        } else {
            continue;
        };

        let uri = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("failed to unescape namespace URI: {}", e)))?;
        out.push(NamespaceDeclaration {
            prefix: prefix.to_string(),
            uri: uri.into_owned(),
            line,
            depth,
        });
    }
    Ok(())
}

/// Incremental byte offset to line number conversion
struct LineTracker<'a> {
    text: &'a [u8],
    offset: usize,
    line: u32,
}

impl<'a> LineTracker<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    /// Offsets must be requested in increasing order
    fn line_at(&mut self, offset: usize) -> u32 {
        let end = offset.min(self.text.len());
        if end > self.offset {
            self.line += self.text[self.offset..end].iter().filter(|&&b| b == b'\n').count() as u32;
            self.offset = end;
        }
        self.line
    }
}
