//! Error types for xsdpile
//!
//! Assembly either produces a complete pile or fails with one of these.
//! User-facing configuration problems are [`ConfigError`]s; a schema loader
//! that contradicts itself is reported separately as
//! [`Error::InconsistentLoader`].

use std::fmt;
use thiserror::Error;

/// Result type alias using xsdpile Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pile resolution and assembly
#[derive(Error, Debug)]
pub enum Error {
    /// Fatal configuration error caused by a command-line argument
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The schema loader returned a result that disagrees with the documents
    #[error("inconsistent schema loader result: {0}")]
    InconsistentLoader(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Whether this error was caused by user input rather than the loader
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

/// Fatal configuration error with the offending argument
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// The argument (path, file URI or namespace URI) that caused the error
    pub argument: Option<String>,
}

impl ConfigError {
    /// Create a new configuration error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            argument: None,
        }
    }

    /// Set the offending argument
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref arg) = self.argument {
            write!(f, "{}: ", arg)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::new("no mapping for namespace").with_argument("urn:z");
        assert_eq!(format!("{}", err), "urn:z: no mapping for namespace");

        let bare = ConfigError::new("nothing to do");
        assert_eq!(format!("{}", bare), "nothing to do");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ConfigError::new("bad").into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_config());
        assert!(format!("{}", err).starts_with("configuration error: "));
    }

    #[test]
    fn test_inconsistent_loader_is_not_config() {
        let err = Error::InconsistentLoader("urn:a filed under urn:b".to_string());
        assert!(!err.is_config());
    }
}
