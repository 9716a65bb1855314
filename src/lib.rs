//! # xsdpile
//!
//! Resolves a heterogeneous argument list (schema file paths, XML Catalog
//! paths, `file:` URIs and bare namespace URIs) into a closed, locally
//! verified set of XML Schema documents: a *schema pile*.
//!
//! ## Features
//!
//! - Argument classification before any file is touched
//! - Root-element probing to tell catalogs from schema documents
//! - OASIS XML Catalog resolution with caching and remote rejection
//! - Eager catalog traversal for diagnostics
//! - Include/import closure through a pluggable schema loader
//! - Per-document metadata: version, imports, documentation, prefix declarations
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsdpile::SchemaPile;
//!
//! let pile = SchemaPile::new(&["catalog.xml", "urn:example:core", "ext.xsd"])?;
//! for doc in pile.all_schema_documents() {
//!     println!("{} -> {:?}", doc.target_namespace(), pile.document_relative_path(doc));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Arguments and files
pub mod locations;
pub mod documents;
pub mod namespaces;

// Catalogs
pub mod catalog;
pub mod resolver;

// Schema documents and assembly
pub mod inspector;
pub mod loaders;
pub mod pile;

// Re-exports for convenience
pub use error::{ConfigError, Error, Result};
pub use inspector::SchemaDocument;
pub use limits::Limits;
pub use loaders::{AssembledModel, SchemaLoader, XsdLoader};
pub use pile::SchemaPile;
pub use resolver::{CatalogResolver, Resolution};

/// Version of the xsdpile library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// OASIS XML Catalog namespace
pub const CATALOG_NAMESPACE: &str = "urn:oasis:names:tc:entity:xmlns:xml:catalog";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
