//! Argument classification and file location helpers
//!
//! Every command-line argument is either a local path, a `file:` URI or a
//! namespace URI that must later be resolved through the catalogs. This
//! module decides which, before any file is touched, and provides the
//! conversions between paths and absolute `file:` URLs used everywhere else.

use crate::error::{ConfigError, Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// A classified command-line argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local path to a catalog or schema document, taken verbatim
    Path(PathBuf),
    /// Hostless `file:` URI, reduced to its path component
    FileUri(PathBuf),
    /// Namespace URI to be resolved through the catalogs
    Namespace(String),
}

impl Location {
    /// Classify one argument string
    ///
    /// A `file:` URI carrying a host is a fatal configuration error.
    pub fn classify(arg: &str) -> Result<Self> {
        let url = match Url::parse(arg) {
            Ok(url) => url,
            Err(_) => return Ok(Location::Path(PathBuf::from(arg))),
        };

        // "C:\schemas\a.xsd" parses with scheme "c"
        if url.scheme().len() == 1 {
            return Ok(Location::Path(PathBuf::from(arg)));
        }

        if url.scheme() != "file" {
            return Ok(Location::Namespace(arg.to_string()));
        }

        // The url crate folds "localhost" into an empty host; check the raw authority
        if let Some(authority) = raw_file_authority(arg).filter(|a| !a.is_empty()) {
            return Err(ConfigError::new(format!(
                "file URI has host '{}'; only local files are allowed",
                authority
            ))
            .with_argument(arg)
            .into());
        }

        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            return Err(ConfigError::new(format!(
                "file URI has host '{}'; only local files are allowed",
                host
            ))
            .with_argument(arg)
            .into());
        }

        let path = url_to_path(&url).map_err(|_| {
            Error::from(ConfigError::new("file URI has no usable path").with_argument(arg))
        })?;
        Ok(Location::FileUri(path))
    }

    /// The local path, if this argument names a file
    pub fn path(&self) -> Option<&Path> {
        match self {
            Location::Path(p) | Location::FileUri(p) => Some(p),
            Location::Namespace(_) => None,
        }
    }

    /// Check if this argument still needs catalog resolution
    pub fn is_namespace(&self) -> bool {
        matches!(self, Location::Namespace(_))
    }
}

/// Authority component of a `file://` URI as written, before any host folding
fn raw_file_authority(arg: &str) -> Option<&str> {
    let prefix = arg.get(..7)?;
    if !prefix.eq_ignore_ascii_case("file://") {
        return None;
    }
    let rest = &arg[7..];
    Some(rest.split(['/', '?', '#']).next().unwrap_or_default())
}

/// Canonicalize a path and turn it into an absolute `file:` URL
pub fn canonical_file_url(path: &Path) -> Result<Url> {
    let canonical = std::fs::canonicalize(path).map_err(|e| {
        ConfigError::new(format!("cannot canonicalize path: {}", e))
            .with_argument(path.display().to_string())
    })?;
    Url::from_file_path(&canonical).map_err(|_| {
        ConfigError::new("cannot express path as a file URI")
            .with_argument(canonical.display().to_string())
            .into()
    })
}

/// Check that a URL names a local file: `file` scheme and no host
pub fn is_local_file_url(url: &Url) -> bool {
    url.scheme() == "file" && url.host_str().map_or(true, str::is_empty)
}

/// Convert a local `file:` URL into a path, percent-decoding it
pub fn url_to_path(url: &Url) -> Result<PathBuf> {
    if !is_local_file_url(url) {
        return Err(Error::Resource(format!("not a local file URI: {}", url)));
    }
    url.to_file_path()
        .map_err(|_| Error::Resource(format!("file URI has no usable path: {}", url)))
}

/// Normalize a document location reported by a schema loader
///
/// Loader locations may carry percent-encoded separators or backslashes;
/// the result is a clean absolute `file:` URL.
pub fn normalize_location(location: &str) -> Result<Url> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(_) => {
            let path = PathBuf::from(location.replace('\\', "/"));
            return Url::from_file_path(&path).map_err(|_| {
                Error::Resource(format!("location is neither a URI nor an absolute path: {}", location))
            });
        }
    };
    let path = url_to_path(&url)?;
    let slashed = PathBuf::from(path.to_string_lossy().replace('\\', "/"));
    Url::from_file_path(&slashed)
        .map_err(|_| Error::Resource(format!("cannot normalize location: {}", location)))
}
