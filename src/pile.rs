//! Schema pile assembly
//!
//! [`SchemaPile`] turns an unordered argument list (schema paths, catalog
//! paths, `file:` URIs and bare namespace URIs) into a closed set of local
//! schema documents:
//!
//! 1. every argument is classified before any file is opened
//! 2. local files are identified as catalogs or schema documents
//! 3. a [`CatalogResolver`] is built from the catalogs
//! 4. namespace arguments are resolved and checked against the target
//!    namespace of the document they resolve to
//! 5. the initial documents are closed under include/import by a
//!    [`SchemaLoader`]
//! 6. the loader's namespace inventory is reconciled with a fresh
//!    inspection of every document it reported
//! 7. the pile root is computed over every file involved
//!
//! Any failure in steps 1-6 aborts construction; no partial pile is
//! returned. Loader diagnostics are not failures and are kept on the model.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::documents::{identify, DocumentKind};
use crate::error::{ConfigError, Error, Result};
use crate::inspector::SchemaDocument;
use crate::limits::Limits;
use crate::loaders::{AssembledModel, SchemaLoader, ValidatorSchema, XsdLoader};
use crate::locations::{canonical_file_url, normalize_location, url_to_path, Location};
use crate::resolver::{CatalogResolver, Resolution};

/// Position reserved for one schema document in argument order
enum Slot {
    Document(Url),
    Namespace(String),
}

/// A resolved, closed and verified set of schema documents
pub struct SchemaPile {
    initial_catalogs: Vec<Url>,
    initial_schema_documents: Vec<Url>,
    initial_namespace_uris: Vec<String>,
    resolver: Arc<CatalogResolver>,
    loader: Arc<dyn SchemaLoader>,
    model: AssembledModel,
    documents: IndexMap<String, SchemaDocument>,
    pile_root: Option<PathBuf>,
    warnings: Vec<String>,
    validator: OnceCell<ValidatorSchema>,
}

impl fmt::Debug for SchemaPile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaPile")
            .field("initial_catalogs", &self.initial_catalogs)
            .field("initial_schema_documents", &self.initial_schema_documents)
            .field("initial_namespace_uris", &self.initial_namespace_uris)
            .field("namespaces", &self.documents.keys().collect::<Vec<_>>())
            .field("pile_root", &self.pile_root)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl SchemaPile {
    /// Assemble a pile from command-line style arguments with default limits
    pub fn new<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        Self::with_limits(args, Limits::default())
    }

    /// Assemble a pile with explicit limits and the built-in loader
    pub fn with_limits<S: AsRef<str>>(args: &[S], limits: Limits) -> Result<Self> {
        let loader = Arc::new(XsdLoader::new().with_limits(limits.clone()));
        Self::with_loader(args, limits, loader)
    }

    /// Assemble a pile using a custom schema loader
    pub fn with_loader<S: AsRef<str>>(
        args: &[S],
        limits: Limits,
        loader: Arc<dyn SchemaLoader>,
    ) -> Result<Self> {
        // Step 1: classify everything up front
        let classified = args
            .iter()
            .map(|a| Location::classify(a.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        // Step 2: identify local files
        let mut initial_catalogs = Vec::new();
        let mut initial_namespace_uris = Vec::new();
        let mut slots = Vec::new();
        for (arg, location) in args.iter().zip(classified) {
            let path = match location {
                Location::Namespace(ns) => {
                    initial_namespace_uris.push(ns.clone());
                    slots.push(Slot::Namespace(ns));
                    continue;
                }
                Location::Path(p) | Location::FileUri(p) => p,
            };
            let url = canonical_file_url(&path)?;
            match identify(&path)? {
                DocumentKind::Catalog => initial_catalogs.push(url),
                DocumentKind::Schema { .. } => slots.push(Slot::Document(url)),
                DocumentKind::Neither { root_namespace } => {
                    return Err(ConfigError::new(format!(
                        "neither an XML catalog nor a schema document (root namespace '{}')",
                        root_namespace.unwrap_or_default()
                    ))
                    .with_argument(arg.as_ref())
                    .into())
                }
            }
        }

        // Step 3
        let resolver = Arc::new(CatalogResolver::from_urls(
            initial_catalogs.clone(),
            limits.clone(),
        ));

        // Step 4: namespace arguments go back into their reserved slots
        let initial_schema_documents = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Document(url) => Ok(url),
                Slot::Namespace(ns) => resolve_namespace_argument(&resolver, &ns),
            })
            .collect::<Result<Vec<_>>>()?;

        // Step 5
        info!(
            documents = initial_schema_documents.len(),
            catalogs = initial_catalogs.len(),
            "loading schema pile"
        );
        let model = loader.load(&initial_schema_documents, &resolver)?;

        // Step 6
        let mut warnings = Vec::new();
        let mut documents: IndexMap<String, SchemaDocument> = IndexMap::new();
        let mut files: Vec<PathBuf> = Vec::new();
        for (namespace, locations) in model.namespaces() {
            if namespace.is_empty() {
                for location in locations {
                    let message = format!("schema document {} has no target namespace", location);
                    warn!("{}", message);
                    warnings.push(message);
                }
                continue;
            }
            if locations.len() > 1 {
                let message = format!(
                    "{} schema documents for namespace {}: {}",
                    locations.len(),
                    namespace,
                    locations.join(", ")
                );
                warn!("{}", message);
                warnings.push(message);
            }
            for location in locations {
                let url = normalize_location(location)?;
                let document = SchemaDocument::open(&url, &limits)?;
                check_loader_namespace(&document, namespace)?;
                files.push(url_to_path(&url)?);
                documents.entry(namespace.clone()).or_insert(document);
            }
        }

        // Step 7
        for catalog in &initial_catalogs {
            files.push(url_to_path(catalog)?);
        }
        let pile_root = common_root(files.iter().map(PathBuf::as_path));
        debug!(root = ?pile_root, namespaces = documents.len(), "schema pile assembled");

        Ok(Self {
            initial_catalogs,
            initial_schema_documents,
            initial_namespace_uris,
            resolver,
            loader,
            model,
            documents,
            pile_root,
            warnings,
            validator: OnceCell::new(),
        })
    }

    /// Catalog files given as arguments, in argument order
    pub fn initial_catalogs(&self) -> &[Url] {
        &self.initial_catalogs
    }

    /// Initial schema documents, namespace arguments replaced by their resolution
    pub fn initial_schema_documents(&self) -> &[Url] {
        &self.initial_schema_documents
    }

    /// Namespace URIs given as arguments, in argument order
    pub fn initial_namespace_uris(&self) -> &[String] {
        &self.initial_namespace_uris
    }

    /// The local-only resolver this pile was built with
    pub fn resolver(&self) -> &Arc<CatalogResolver> {
        &self.resolver
    }

    /// The loader's closure result and its diagnostics
    pub fn assembled_model(&self) -> &AssembledModel {
        &self.model
    }

    /// Validator-ready schema for the same documents, built on first use
    pub fn validator_schema(&self) -> Result<&ValidatorSchema> {
        self.validator.get_or_try_init(|| {
            ValidatorSchema::build(
                self.loader.as_ref(),
                &self.initial_schema_documents,
                Arc::clone(&self.resolver),
            )
        })
    }

    /// Record for the document that defines a namespace
    pub fn schema_document(&self, namespace: &str) -> Option<&SchemaDocument> {
        self.documents.get(namespace)
    }

    /// One record per namespace, in loader order
    pub fn all_schema_documents(&self) -> Vec<&SchemaDocument> {
        self.documents.values().collect()
    }

    /// Every namespace with a document in the pile
    pub fn namespace_uris(&self) -> Vec<&str> {
        self.documents.keys().map(String::as_str).collect()
    }

    /// Longest common directory of every schema and catalog file
    pub fn pile_root(&self) -> Option<&Path> {
        self.pile_root.as_deref()
    }

    /// Path of a local file relative to the pile root
    pub fn relative_path(&self, url: &Url) -> Option<PathBuf> {
        let root = self.pile_root.as_ref()?;
        let path = url_to_path(url).ok()?;
        path.strip_prefix(root).ok().map(Path::to_path_buf)
    }

    /// Path of a schema document relative to the pile root
    pub fn document_relative_path(&self, document: &SchemaDocument) -> Option<PathBuf> {
        self.relative_path(document.url())
    }

    /// Every catalog reachable from the initial catalogs
    pub fn all_catalog_files(&self) -> Vec<Url> {
        self.resolver.all_catalog_files()
    }

    /// Validation messages for reachable catalogs
    pub fn all_catalog_validation_messages(&self) -> Vec<String> {
        self.resolver.all_validation_messages()
    }

    /// Non-fatal anomalies found during assembly
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Resolve one namespace argument and check what it resolves to
fn resolve_namespace_argument(resolver: &CatalogResolver, namespace: &str) -> Result<Url> {
    let url = match resolver.resolve(namespace) {
        Resolution::Resolved(url) => url,
        Resolution::NoMapping => {
            return Err(ConfigError::new("no mapping for namespace URI in any catalog")
                .with_argument(namespace)
                .into())
        }
        Resolution::RemoteMapping(target) => {
            return Err(ConfigError::new(format!(
                "namespace URI maps to '{}', which is not a local file",
                target
            ))
            .with_argument(namespace)
            .into())
        }
    };

    let unusable = |e: Error| {
        let reason = match e {
            Error::Config(c) => c.message,
            other => other.to_string(),
        };
        Error::from(
            ConfigError::new(format!("resolved to {}: {}", url, reason)).with_argument(namespace),
        )
    };
    let path = url_to_path(&url).map_err(unusable)?;
    let canonical = canonical_file_url(&path).map_err(unusable)?;
    match identify(&path).map_err(unusable)? {
        DocumentKind::Schema { target_namespace } if target_namespace == namespace => {
            debug!(namespace, document = %canonical, "namespace argument resolved");
            Ok(canonical)
        }
        DocumentKind::Schema { target_namespace } => Err(ConfigError::new(format!(
            "{} resolves to {}, whose target namespace is '{}', not '{}'",
            namespace, canonical, target_namespace, namespace
        ))
        .with_argument(namespace)
        .into()),
        _ => Err(ConfigError::new(format!(
            "{} resolves to {}, which is not a schema document",
            namespace, canonical
        ))
        .with_argument(namespace)
        .into()),
    }
}

/// The loader must file each document under the namespace it declares
fn check_loader_namespace(document: &SchemaDocument, namespace: &str) -> Result<()> {
    let declared = document.target_namespace();
    if declared == namespace {
        return Ok(());
    }
    Err(Error::InconsistentLoader(format!(
        "{} was reported under namespace '{}' but declares '{}'",
        document.url(),
        namespace,
        declared
    )))
}

/// Longest common directory over the parent directories of `paths`
fn common_root<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    for path in paths {
        let dir = path.parent().unwrap_or(path);
        root = Some(match root {
            None => dir.to_path_buf(),
            Some(current) => current
                .components()
                .zip(dir.components())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    root
}
