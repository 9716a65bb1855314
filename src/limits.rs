//! Limits and constraints for pile assembly
//!
//! Guards against runaway inputs: oversized documents, absurdly long
//! catalog chains and piles that never close.

use crate::error::{Error, Result};

/// Limits configuration threaded through the resolver and the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size in bytes of a schema or catalog document
    pub max_document_size: usize,

    /// Maximum length of a nextCatalog / delegateURI chain followed during lookup
    pub max_catalog_chain: usize,

    /// Maximum number of schema documents the loader may pull into one pile
    pub max_pile_documents: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_size: 100 * 1024 * 1024, // 100 MB
            max_catalog_chain: 50,
            max_pile_documents: 10_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_document_size: 10 * 1024 * 1024, // 10 MB
            max_catalog_chain: 10,
            max_pile_documents: 1_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_document_size: 1024 * 1024 * 1024, // 1 GB
            max_catalog_chain: 1_000,
            max_pile_documents: 1_000_000,
        }
    }

    /// Check if a document size is within limits
    pub fn check_document_size(&self, size: usize) -> Result<()> {
        if size > self.max_document_size {
            Err(Error::LimitExceeded(format!(
                "document size {} bytes exceeds maximum {} bytes",
                size, self.max_document_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a catalog chain depth is within limits
    pub fn check_catalog_chain(&self, depth: usize) -> Result<()> {
        if depth > self.max_catalog_chain {
            Err(Error::LimitExceeded(format!(
                "catalog chain depth {} exceeds maximum {}",
                depth, self.max_catalog_chain
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of pile documents is within limits
    pub fn check_pile_documents(&self, count: usize) -> Result<()> {
        if count > self.max_pile_documents {
            Err(Error::LimitExceeded(format!(
                "pile document count {} exceeds maximum {}",
                count, self.max_pile_documents
            )))
        } else {
            Ok(())
        }
    }
}
