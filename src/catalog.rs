//! XML Catalog support for namespace URI resolution
//!
//! This module reads OASIS XML Catalog files and answers URI lookups for a
//! single catalog file. Chaining between files (`nextCatalog`,
//! `delegateURI`) is reported back to the caller rather than followed here;
//! see [`crate::resolver`] for the traversal.
//!
//! XML Catalogs are defined by OASIS:
//! https://www.oasis-open.org/committees/entity/spec-2001-08-06.html
//!
//! # Supported Elements
//!
//! - `<catalog>` - Root element
//! - `<group>` - Grouping element (inherits base from parent)
//! - `<uri>` - Maps a URI (here, a namespace URI) to a location
//! - `<rewriteURI>` - Rewrites a URI prefix
//! - `<uriSuffix>` - Maps URIs ending with a suffix
//! - `<delegateURI>` - Hands URIs with a prefix to other catalogs
//! - `<nextCatalog>` - Chains another catalog file
//!
//! The identifier entries (`public`, `system` and friends) are accepted and
//! checked but take no part in URI resolution.
//!
//! # Example
//!
//! ```xml
//! <catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
//!   <uri name="http://release.niem.gov/niem/niem-core/5.0/"
//!        uri="niem/niem-core.xsd"/>
//!   <nextCatalog catalog="base/catalog.xml"/>
//! </catalog>
//! ```

use roxmltree::{Node, ParsingOptions};
use url::Url;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::url_to_path;
use crate::{CATALOG_NAMESPACE, XML_NAMESPACE};

/// Entry types and their required attributes
const ENTRY_TYPES: &[(&str, &[&str])] = &[
    ("group", &[]),
    ("public", &["publicId", "uri"]),
    ("system", &["systemId", "uri"]),
    ("rewriteSystem", &["systemIdStartString", "rewritePrefix"]),
    ("systemSuffix", &["systemIdSuffix", "uri"]),
    ("delegatePublic", &["publicIdStartString", "catalog"]),
    ("delegateSystem", &["systemIdStartString", "catalog"]),
    ("uri", &["name", "uri"]),
    ("rewriteURI", &["uriStartString", "rewritePrefix"]),
    ("uriSuffix", &["uriSuffix", "uri"]),
    ("delegateURI", &["uriStartString", "catalog"]),
    ("nextCatalog", &["catalog"]),
];

/// One catalog entry that takes part in URI resolution
///
/// All locations are already made absolute against the entry's base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// `<uri name=".." uri=".."/>`
    Uri {
        /// URI to match exactly
        name: String,
        /// Location it maps to
        target: String,
    },
    /// `<rewriteURI uriStartString=".." rewritePrefix=".."/>`
    RewriteUri {
        /// Prefix to match
        start: String,
        /// Replacement for the matched prefix
        prefix: String,
    },
    /// `<uriSuffix uriSuffix=".." uri=".."/>`
    UriSuffix {
        /// Suffix to match
        suffix: String,
        /// Location it maps to
        target: String,
    },
    /// `<delegateURI uriStartString=".." catalog=".."/>`
    DelegateUri {
        /// Prefix to match
        start: String,
        /// Catalog consulted for matching URIs
        catalog: Url,
    },
    /// `<nextCatalog catalog=".."/>`
    NextCatalog {
        /// Catalog consulted after this one
        catalog: Url,
    },
}

/// Outcome of looking a URI up in one catalog file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The catalog maps the URI to this location
    Found(String),
    /// Only these catalogs may answer, in this order
    Delegate(Vec<Url>),
    /// Nothing here; these chained catalogs come next, in order
    Next(Vec<Url>),
}

/// A parsed, structurally checked catalog file
#[derive(Debug, Clone)]
pub struct CatalogFile {
    url: Url,
    entries: Vec<CatalogEntry>,
    chained: Vec<Url>,
}

impl CatalogFile {
    /// Read and check a catalog file
    ///
    /// Fails when the file cannot be read, is not well-formed, or does not
    /// follow the catalog structure.
    pub fn load(url: &Url, limits: &Limits) -> Result<Self> {
        let path = url_to_path(url)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Resource(format!("failed to read catalog '{}': {}", path.display(), e))
        })?;
        limits.check_document_size(content.len())?;
        Self::parse(url, &content)
    }

    /// Parse catalog XML content located at `url`
    pub fn parse(url: &Url, xml: &str) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(xml, options)?;
        let root = doc.root_element();

        if root.tag_name().namespace() != Some(CATALOG_NAMESPACE)
            || root.tag_name().name() != "catalog"
        {
            return Err(Error::Resource(format!(
                "expected {{{}}}catalog root element, got {}",
                CATALOG_NAMESPACE,
                root.tag_name().name()
            )));
        }
        check_prefer(&root)?;

        let base = xml_base(&root, url)?;
        let mut catalog = Self {
            url: url.clone(),
            entries: Vec::new(),
            chained: Vec::new(),
        };
        catalog.process_children(&root, &base)?;
        Ok(catalog)
    }

    /// Process children of a catalog or group element
    fn process_children(&mut self, parent: &Node, base: &Url) -> Result<()> {
        for child in parent.children().filter(|n| n.is_element()) {
            // Elements from other namespaces are extensions
            if child.tag_name().namespace() != Some(CATALOG_NAMESPACE) {
                continue;
            }
            let name = child.tag_name().name();
            let required = ENTRY_TYPES
                .iter()
                .find(|(entry, _)| *entry == name)
                .map(|(_, attrs)| *attrs)
                .ok_or_else(|| Error::Resource(format!("unknown catalog entry <{}>", name)))?;

            for attr in required {
                if child.attribute(*attr).is_none() {
                    return Err(Error::Resource(format!(
                        "<{}> at line {} is missing required attribute '{}'",
                        name,
                        line_of(&child),
                        attr
                    )));
                }
            }

            let base = xml_base(&child, base)?;
            let attr = |a: &str| child.attribute(a).unwrap_or_default().to_string();
            match name {
                "group" => {
                    check_prefer(&child)?;
                    self.process_children(&child, &base)?;
                }
                "uri" => self.entries.push(CatalogEntry::Uri {
                    name: attr("name"),
                    target: join(&base, &attr("uri")),
                }),
                "rewriteURI" => self.entries.push(CatalogEntry::RewriteUri {
                    start: attr("uriStartString"),
                    prefix: join(&base, &attr("rewritePrefix")),
                }),
                "uriSuffix" => self.entries.push(CatalogEntry::UriSuffix {
                    suffix: attr("uriSuffix"),
                    target: join(&base, &attr("uri")),
                }),
                "delegateURI" => {
                    let catalog = base.join(&attr("catalog"))?;
                    self.chained.push(catalog.clone());
                    self.entries.push(CatalogEntry::DelegateUri {
                        start: attr("uriStartString"),
                        catalog,
                    });
                }
                "nextCatalog" => {
                    let catalog = base.join(&attr("catalog"))?;
                    self.chained.push(catalog.clone());
                    self.entries.push(CatalogEntry::NextCatalog { catalog });
                }
                "delegatePublic" | "delegateSystem" => {
                    self.chained.push(base.join(&attr("catalog"))?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Location of this catalog file
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URI resolution entries, in document order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Every catalog file this one links to, in document order
    pub fn chained_catalogs(&self) -> &[Url] {
        &self.chained
    }

    /// Look a URI up in this file
    ///
    /// Precedence: exact `uri`, then the longest `rewriteURI`, then the
    /// longest `uriSuffix`, then matching `delegateURI` catalogs (longest
    /// prefix first), then `nextCatalog` files.
    pub fn lookup(&self, uri: &str) -> Lookup {
        let mut rewrite: Option<(&str, &str)> = None;
        let mut suffix: Option<(&str, &str)> = None;
        let mut delegates: Vec<(&str, &Url)> = Vec::new();
        let mut next = Vec::new();

        for entry in &self.entries {
            match entry {
                CatalogEntry::Uri { name, target } if name == uri => {
                    return Lookup::Found(target.clone());
                }
                CatalogEntry::RewriteUri { start, prefix } if uri.starts_with(start.as_str()) => {
                    if rewrite.map_or(true, |(s, _)| start.len() > s.len()) {
                        rewrite = Some((start.as_str(), prefix.as_str()));
                    }
                }
                CatalogEntry::UriSuffix { suffix: s, target } if uri.ends_with(s.as_str()) => {
                    if suffix.map_or(true, |(best, _)| s.len() > best.len()) {
                        suffix = Some((s.as_str(), target.as_str()));
                    }
                }
                CatalogEntry::DelegateUri { start, catalog } if uri.starts_with(start.as_str()) => {
                    delegates.push((start.as_str(), catalog));
                }
                CatalogEntry::NextCatalog { catalog } => next.push(catalog.clone()),
                _ => {}
            }
        }

        if let Some((start, prefix)) = rewrite {
            return Lookup::Found(format!("{}{}", prefix, &uri[start.len()..]));
        }
        if let Some((_, target)) = suffix {
            return Lookup::Found(target.to_string());
        }
        if !delegates.is_empty() {
            delegates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            let mut catalogs: Vec<Url> = Vec::new();
            for (_, catalog) in delegates {
                if !catalogs.contains(catalog) {
                    catalogs.push(catalog.clone());
                }
            }
            return Lookup::Delegate(catalogs);
        }
        Lookup::Next(next)
    }
}

/// Effective base URI of an element: its `xml:base` resolved against the parent base
fn xml_base(node: &Node, parent: &Url) -> Result<Url> {
    match node.attribute((XML_NAMESPACE, "base")) {
        Some(base) => Ok(parent.join(base)?),
        None => Ok(parent.clone()),
    }
}

fn check_prefer(node: &Node) -> Result<()> {
    match node.attribute("prefer") {
        None | Some("system") | Some("public") => Ok(()),
        Some(other) => Err(Error::Resource(format!(
            "invalid prefer value '{}' at line {}",
            other,
            line_of(node)
        ))),
    }
}

/// Resolve a catalog location against a base, keeping the raw text if it is not a URI reference
fn join(base: &Url, location: &str) -> String {
    base.join(location)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

fn line_of(node: &Node) -> u32 {
    node.document().text_pos_at(node.range().start).row
}
