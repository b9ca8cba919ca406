//! Error types for wsdlmerge
//!
//! This module defines all error types used throughout the library.
//! The variants follow the failure taxonomy of the resolution pipeline:
//! structural grammar violations, unresolvable references, namespace
//! contract violations and resource problems.

use std::fmt;
use thiserror::Error;

/// Result type alias using wsdlmerge Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wsdlmerge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Structural grammar violation against the WSDL/XSD/SOAP/MIME tables
    #[error("grammar violation: {0}")]
    Grammar(#[from] GrammarError),

    /// A referenced location could not be supplied
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Import/include target-namespace contract violation
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Resolution failure (closure did not stabilize, no usable roots, ...)
    #[error("resolution error: {0}")]
    Resolution(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Fatal structural violation with context
///
/// Produced by the structural validator when a file cannot be processed
/// further. Recoverable (MIME-family) violations go to the diagnostics
/// sink instead and never become a `GrammarError`.
#[derive(Debug, Clone)]
pub struct GrammarError {
    /// Error message
    pub message: String,
    /// File the violation was found in
    pub file: Option<String>,
    /// WS-I style rule citation (e.g. "R2028")
    pub citation: Option<String>,
}

impl GrammarError {
    /// Create a new grammar error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            citation: None,
        }
    }

    /// Set the file the violation belongs to
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the rule citation
    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref citation) = self.citation {
            write!(f, " [{}]", citation)?;
        }

        if let Some(ref file) = self.file {
            write!(f, "\n\nFile: {}", file)?;
        }

        Ok(())
    }
}

impl std::error::Error for GrammarError {}
