//! Catalog-backed namespace resolution
//!
//! [`CatalogResolver`] answers "which local file defines this namespace?"
//! for a fixed set of catalog files. Answers are cached per namespace and
//! anything that does not land on a local, hostless `file:` URI is refused
//! instead of fetched.
//!
//! Independently of lookups, the resolver can walk every catalog reachable
//! from its initial set and check each one, so broken catalogs surface even
//! when no lookup ever needed them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::{CatalogFile, Lookup};
use crate::error::Result;
use crate::limits::Limits;
use crate::locations::{canonical_file_url, is_local_file_url};

/// Result of resolving one namespace URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The catalogs map the namespace to this local file
    Resolved(Url),
    /// No catalog maps the namespace
    NoMapping,
    /// The catalogs map the namespace somewhere that is not a local file
    RemoteMapping(String),
}

/// Catalog closure and the problems found while walking it
#[derive(Debug, Clone, Default)]
struct CatalogTraversal {
    files: IndexSet<Url>,
    messages: Vec<String>,
}

/// Resolves namespace URIs through a fixed set of catalog files
#[derive(Debug)]
pub struct CatalogResolver {
    catalogs: Vec<Url>,
    limits: Limits,
    cache: Mutex<HashMap<String, Resolution>>,
    parsed: Mutex<HashMap<Url, Option<Arc<CatalogFile>>>>,
    traversal: OnceCell<CatalogTraversal>,
}

impl CatalogResolver {
    /// Create a resolver for the given catalog files
    ///
    /// Paths are canonicalized now; the files themselves are not read until
    /// a lookup or traversal needs them.
    pub fn new<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::with_limits(paths, Limits::default())
    }

    /// Create a resolver with explicit limits
    pub fn with_limits<P: AsRef<Path>>(paths: &[P], limits: Limits) -> Result<Self> {
        let catalogs = paths
            .iter()
            .map(|p| canonical_file_url(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_urls(catalogs, limits))
    }

    /// Create a resolver from already canonical catalog URLs
    pub fn from_urls(catalogs: Vec<Url>, limits: Limits) -> Self {
        Self {
            catalogs,
            limits,
            cache: Mutex::new(HashMap::new()),
            parsed: Mutex::new(HashMap::new()),
            traversal: OnceCell::new(),
        }
    }

    /// The catalog files this resolver was built from, in order
    pub fn initial_catalogs(&self) -> &[Url] {
        &self.catalogs
    }

    /// Resolve a namespace URI
    ///
    /// The same namespace always yields the same answer from one resolver.
    pub fn resolve(&self, namespace: &str) -> Resolution {
        if let Some(hit) = self.lock_cache().get(namespace) {
            return hit.clone();
        }

        let resolution = match self.lookup(namespace) {
            None => Resolution::NoMapping,
            Some(raw) => match Url::parse(&raw) {
                Ok(url) if is_local_file_url(&url) => Resolution::Resolved(url),
                _ => Resolution::RemoteMapping(raw),
            },
        };
        debug!(namespace, ?resolution, "resolved namespace");

        // A concurrent caller may have won the race; keep whichever landed first
        self.lock_cache()
            .entry(namespace.to_string())
            .or_insert(resolution)
            .clone()
    }

    /// Resolve a namespace URI to a local file, if the catalogs allow it
    pub fn resolve_uri(&self, namespace: &str) -> Option<Url> {
        match self.resolve(namespace) {
            Resolution::Resolved(url) => Some(url),
            _ => None,
        }
    }

    /// Every catalog file reachable from the initial set
    ///
    /// Includes files that failed to load; see [`Self::all_validation_messages`].
    pub fn all_catalog_files(&self) -> Vec<Url> {
        self.traverse().files.iter().cloned().collect()
    }

    /// One message per reachable catalog file that could not be read or checked
    pub fn all_validation_messages(&self) -> Vec<String> {
        self.traverse().messages.clone()
    }

    /// Walk the catalog chain for one namespace, OASIS order
    fn lookup(&self, namespace: &str) -> Option<String> {
        let mut stack: Vec<(Url, usize)> =
            self.catalogs.iter().rev().map(|c| (c.clone(), 0)).collect();
        let mut visited: HashSet<Url> = HashSet::new();

        while let Some((url, depth)) = stack.pop() {
            if !visited.insert(url.clone()) {
                continue;
            }
            if let Err(e) = self.limits.check_catalog_chain(depth) {
                warn!(catalog = %url, "{}", e);
                continue;
            }
            let Some(catalog) = self.catalog(&url) else {
                continue;
            };

            match catalog.lookup(namespace) {
                Lookup::Found(target) => {
                    debug!(namespace, catalog = %url, %target, "catalog match");
                    return Some(target);
                }
                Lookup::Delegate(delegates) => {
                    // Delegation replaces everything still pending
                    stack.clear();
                    stack.extend(delegates.into_iter().rev().map(|d| (d, depth + 1)));
                }
                Lookup::Next(next) => {
                    stack.extend(next.into_iter().rev().map(|n| (n, depth + 1)));
                }
            }
        }
        None
    }

    /// Parsed catalog file, loading it on first use
    fn catalog(&self, url: &Url) -> Option<Arc<CatalogFile>> {
        let mut parsed = self.parsed.lock().unwrap_or_else(PoisonError::into_inner);
        parsed
            .entry(url.clone())
            .or_insert_with(|| match CatalogFile::load(url, &self.limits) {
                Ok(catalog) => Some(Arc::new(catalog)),
                Err(e) => {
                    debug!(catalog = %url, error = %e, "catalog unusable for lookup");
                    None
                }
            })
            .clone()
    }

    /// Breadth-first walk over every chained catalog, memoized
    fn traverse(&self) -> &CatalogTraversal {
        self.traversal.get_or_init(|| {
            let mut walk = CatalogTraversal::default();
            let mut queue: VecDeque<Url> = self.catalogs.iter().cloned().collect();

            while let Some(url) = queue.pop_front() {
                if !walk.files.insert(url.clone()) {
                    continue;
                }
                match CatalogFile::load(&url, &self.limits) {
                    Ok(catalog) => queue.extend(catalog.chained_catalogs().iter().cloned()),
                    Err(e) => {
                        warn!(catalog = %url, error = %e, "invalid catalog");
                        walk.messages.push(format!("{}: {}", url, e));
                    }
                }
            }
            walk
        })
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Resolution>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
