//! Diagnostics sink
//!
//! An append-only channel for findings produced while resolving a document
//! set. Warning-and-below findings never abort a run; error findings are
//! tied to the file being processed and escalate to the owning root
//! document's result.

use serde::Serialize;
use std::fmt;

/// Severity of a diagnostic finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Fine-grained progress detail
    Detail,
    /// Informational finding
    Info,
    /// Recoverable problem; processing continues
    Warning,
    /// Fatal problem for the file/document being processed
    Error,
}

impl Severity {
    /// Get the severity as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Detail => "detail",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic finding
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity of the finding
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// File the finding is attached to, if any
    pub file: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {}: {}", self.severity, file, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Append-only collection of diagnostics for one resolution request
#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding
    pub fn push(&mut self, severity: Severity, message: impl Into<String>, file: Option<&str>) {
        let diag = Diagnostic {
            severity,
            message: message.into(),
            file: file.map(|f| f.to_string()),
        };
        match severity {
            Severity::Error => tracing::error!(file = ?diag.file, "{}", diag.message),
            Severity::Warning => tracing::warn!(file = ?diag.file, "{}", diag.message),
            _ => tracing::debug!(file = ?diag.file, "{}", diag.message),
        }
        self.entries.push(diag);
    }

    /// Append a detail finding
    pub fn detail(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.push(Severity::Detail, message, file);
    }

    /// Append an info finding
    pub fn info(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.push(Severity::Info, message, file);
    }

    /// Append a warning finding
    pub fn warning(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.push(Severity::Warning, message, file);
    }

    /// Append an error finding
    pub fn error(&mut self, message: impl Into<String>, file: Option<&str>) {
        self.push(Severity::Error, message, file);
    }

    /// All findings, in append order
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Whether any error-severity finding was recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Whether any error-severity finding was recorded against a file
    pub fn has_errors_for(&self, file: &str) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Error && d.file.as_deref() == Some(file))
    }

    /// Move all findings out of the sink
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_query() {
        let mut diags = Diagnostics::new();
        diags.info("starting", None);
        diags.warning("chameleon include of x.xsd", Some("a.xsd"));
        assert_eq!(diags.entries().len(), 2);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_errors_scoped_to_file() {
        let mut diags = Diagnostics::new();
        diags.error("bad children", Some("a.wsdl"));
        assert!(diags.has_errors());
        assert!(diags.has_errors_for("a.wsdl"));
        assert!(!diags.has_errors_for("b.wsdl"));
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new();
        diags.warning("soap 1.1 and 1.2 mixed", Some("svc.wsdl"));
        let text = format!("{}", diags.entries()[0]);
        assert_eq!(text, "[warning] svc.wsdl: soap 1.1 and 1.2 mixed");
    }
}
