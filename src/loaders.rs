//! Schema loading
//!
//! The pile assembler hands its initial documents to a [`SchemaLoader`],
//! which follows `xs:include`, `xs:redefine`, `xs:override` and `xs:import`
//! until the set of documents is closed, and reports which documents
//! define which namespace. Problems found along the way are collected as
//! [`LoaderMessage`]s; they never stop the load.
//!
//! [`XsdLoader`] is the built-in implementation. It never fetches anything
//! off the local machine: a reference that only resolves to a remote URI is
//! reported, not followed.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use roxmltree::ParsingOptions;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::limits::Limits;
use crate::locations::{is_local_file_url, url_to_path};
use crate::resolver::{CatalogResolver, Resolution};
use crate::XSD_NAMESPACE;

/// Severity of a loader message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Suspicious but harmless
    Warning,
    /// The document set is not valid as written
    Error,
    /// A document could not be processed at all
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// One diagnostic collected during a load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderMessage {
    /// How bad it is
    pub severity: Severity,
    /// Document the problem was found in
    pub file: String,
    /// 1-based line, 0 when unknown
    pub line: u32,
    /// 1-based column, 0 when unknown
    pub column: u32,
    /// Message text
    pub message: String,
}

impl fmt::Display for LoaderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{}:{}: {}",
            self.severity, self.file, self.line, self.column, self.message
        )
    }
}

/// Result of loading a document set: namespace inventory plus diagnostics
#[derive(Debug, Clone, Default)]
pub struct AssembledModel {
    namespaces: IndexMap<String, Vec<String>>,
    messages: Vec<LoaderMessage>,
}

impl AssembledModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// File a document location under a namespace (empty string for none)
    pub fn add_document(&mut self, namespace: impl Into<String>, location: impl Into<String>) {
        let docs = self.namespaces.entry(namespace.into()).or_default();
        let location = location.into();
        if !docs.contains(&location) {
            docs.push(location);
        }
    }

    /// Record a diagnostic
    pub fn add_message(&mut self, message: LoaderMessage) {
        self.messages.push(message);
    }

    /// Namespace inventory in discovery order
    pub fn namespaces(&self) -> &IndexMap<String, Vec<String>> {
        &self.namespaces
    }

    /// Document locations filed under one namespace
    pub fn documents_for(&self, namespace: &str) -> &[String] {
        self.namespaces
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every document location, in discovery order
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.namespaces.values().flatten().map(String::as_str)
    }

    /// Collected diagnostics
    pub fn messages(&self) -> &[LoaderMessage] {
        &self.messages
    }

    /// Whether any diagnostic is an error or worse
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity >= Severity::Error)
    }
}

/// The engine that closes a document set under include/import
pub trait SchemaLoader: Send + Sync {
    /// Load `documents` and everything they reach, resolving through `resolver`
    fn load(&self, documents: &[Url], resolver: &CatalogResolver) -> Result<AssembledModel>;
}

/// Why a document is being loaded
#[derive(Debug, Clone)]
enum Reference {
    Initial,
    Include { namespace: String },
    Import { namespace: String },
}

#[derive(Debug, Clone)]
struct PendingDocument {
    url: Url,
    reference: Reference,
    origin: Option<(String, u32, u32)>,
}

/// Built-in local-only XSD loader
#[derive(Debug, Clone, Default)]
pub struct XsdLoader {
    limits: Limits,
}

impl XsdLoader {
    /// Create a loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn load_one(
        &self,
        work: &PendingDocument,
        resolver: &CatalogResolver,
        model: &mut AssembledModel,
        pending: &mut VecDeque<PendingDocument>,
    ) {
        let here = work.url.to_string();
        let report = |model: &mut AssembledModel,
                      severity: Severity,
                      line: u32,
                      column: u32,
                      message: String| {
            let (file, line, column) = match &work.origin {
                Some((file, l, c)) if line == 0 => (file.clone(), *l, *c),
                _ => (here.clone(), line, column),
            };
            model.add_message(LoaderMessage { severity, file, line, column, message });
        };

        let content = match url_to_path(&work.url)
            .and_then(|p| std::fs::read_to_string(&p).map_err(Into::into))
        {
            Ok(content) => content,
            Err(e) => {
                report(model, Severity::Fatal, 0, 0, format!("cannot read {}: {}", here, e));
                return;
            }
        };
        if let Err(e) = self.limits.check_document_size(content.len()) {
            report(model, Severity::Fatal, 0, 0, format!("{}: {}", here, e));
            return;
        }

        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = match roxmltree::Document::parse_with_options(&content, options) {
            Ok(doc) => doc,
            Err(e) => {
                let pos = e.pos();
                model.add_message(LoaderMessage {
                    severity: Severity::Fatal,
                    file: here.clone(),
                    line: pos.row,
                    column: pos.col,
                    message: e.to_string(),
                });
                return;
            }
        };

        let root = doc.root_element();
        if root.tag_name().namespace() != Some(XSD_NAMESPACE) || root.tag_name().name() != "schema" {
            report(
                model,
                Severity::Error,
                0,
                0,
                format!("{} is not an XML Schema document", here),
            );
            return;
        }

        let declared = root.attribute("targetNamespace").unwrap_or("");
        let namespace = match &work.reference {
            Reference::Initial => declared.to_string(),
            Reference::Include { namespace } => {
                if declared.is_empty() {
                    // Chameleon include: filed as no-namespace, its own includes
                    // still take the including namespace
                    namespace.clone()
                } else if declared != namespace {
                    report(
                        model,
                        Severity::Error,
                        0,
                        0,
                        format!(
                            "included schema {} has targetNamespace '{}', expected '{}'",
                            here, declared, namespace
                        ),
                    );
                    return;
                } else {
                    declared.to_string()
                }
            }
            Reference::Import { namespace } => {
                if declared != namespace {
                    report(
                        model,
                        Severity::Error,
                        0,
                        0,
                        format!(
                            "imported schema {} has targetNamespace '{}', expected '{}'",
                            here, declared, namespace
                        ),
                    );
                    return;
                }
                declared.to_string()
            }
        };

        debug!(document = %here, namespace = %namespace, "loaded schema document");
        model.add_document(declared, here.as_str());

        for child in root.children().filter(|n| n.is_element()) {
            if child.tag_name().namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            let pos = doc.text_pos_at(child.range().start);
            let origin = Some((here.clone(), pos.row, pos.col));
            let location = child.attribute("schemaLocation");

            let (target, reference) = match child.tag_name().name() {
                "include" | "redefine" | "override" => {
                    let Some(location) = location else {
                        report(
                            model,
                            Severity::Error,
                            pos.row,
                            pos.col,
                            format!("xs:{} without schemaLocation", child.tag_name().name()),
                        );
                        continue;
                    };
                    (
                        self.locate(&work.url, location),
                        Reference::Include {
                            namespace: namespace.clone(),
                        },
                    )
                }
                "import" => {
                    let imported = child.attribute("namespace").unwrap_or("").to_string();
                    match self.locate_import(&work.url, &imported, location, resolver) {
                        Ok(Some(target)) => (Ok(target), Reference::Import { namespace: imported }),
                        Ok(None) => {
                            report(
                                model,
                                Severity::Warning,
                                pos.row,
                                pos.col,
                                format!("no location known for imported namespace '{}'", imported),
                            );
                            continue;
                        }
                        Err(message) => (Err(message), Reference::Import { namespace: imported }),
                    }
                }
                _ => continue,
            };

            match target {
                Ok(url) => pending.push_back(PendingDocument {
                    url,
                    reference,
                    origin,
                }),
                Err(message) => report(model, Severity::Error, pos.row, pos.col, message),
            }
        }
    }

    /// Resolve a schemaLocation against the referencing document; local files only
    fn locate(&self, base: &Url, location: &str) -> std::result::Result<Url, String> {
        let url = base
            .join(location)
            .map_err(|e| format!("bad schemaLocation '{}': {}", location, e))?;
        if is_local_file_url(&url) {
            Ok(url)
        } else {
            Err(format!("remote schemaLocation '{}' is not fetched", url))
        }
    }

    /// Catalog first, then the location hint
    fn locate_import(
        &self,
        base: &Url,
        namespace: &str,
        location: Option<&str>,
        resolver: &CatalogResolver,
    ) -> std::result::Result<Option<Url>, String> {
        if !namespace.is_empty() {
            match resolver.resolve(namespace) {
                Resolution::Resolved(url) => return Ok(Some(url)),
                Resolution::RemoteMapping(target) => {
                    return Err(format!(
                        "namespace '{}' maps to remote location '{}'",
                        namespace, target
                    ))
                }
                Resolution::NoMapping => {}
            }
        }
        location.map(|loc| self.locate(base, loc)).transpose()
    }
}

impl SchemaLoader for XsdLoader {
    fn load(&self, documents: &[Url], resolver: &CatalogResolver) -> Result<AssembledModel> {
        let mut model = AssembledModel::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut pending: VecDeque<PendingDocument> = documents
            .iter()
            .map(|url| PendingDocument {
                url: url.clone(),
                reference: Reference::Initial,
                origin: None,
            })
            .collect();

        while let Some(work) = pending.pop_front() {
            let key = canonical_key(&work.url);
            if !visited.insert(key) {
                continue;
            }
            self.limits.check_pile_documents(visited.len())?;
            self.load_one(&work, resolver, &mut model, &mut pending);
        }

        for message in model.messages().iter().filter(|m| m.severity >= Severity::Error) {
            warn!("{}", message);
        }
        Ok(model)
    }
}

/// Same file reached through different spellings counts once
fn canonical_key(url: &Url) -> Url {
    url_to_path(url)
        .ok()
        .and_then(|p| std::fs::canonicalize(p).ok())
        .and_then(|p| Url::from_file_path(p).ok())
        .unwrap_or_else(|| url.clone())
}

/// Validator-ready view of a pile: the closed document list and its diagnostics
#[derive(Debug, Clone)]
pub struct ValidatorSchema {
    documents: Vec<String>,
    messages: Vec<LoaderMessage>,
    resolver: Arc<CatalogResolver>,
}

impl ValidatorSchema {
    /// Run `loader` over the initial documents and keep what an instance validator needs
    pub fn build(
        loader: &dyn SchemaLoader,
        documents: &[Url],
        resolver: Arc<CatalogResolver>,
    ) -> Result<Self> {
        let model = loader.load(documents, &resolver)?;
        Ok(Self {
            documents: model.documents().map(str::to_string).collect(),
            messages: model.messages().to_vec(),
            resolver,
        })
    }

    /// Every document the validator schema is built from
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Diagnostics from building the validator schema
    pub fn messages(&self) -> &[LoaderMessage] {
        &self.messages
    }

    /// Resolver instance validators must use for the same local-only policy
    pub fn resolver(&self) -> &CatalogResolver {
        &self.resolver
    }
}
