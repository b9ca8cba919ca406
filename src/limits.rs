//! Limits and constraints for document-set processing
//!
//! This module defines ceilings that keep a resolution request bounded:
//! runaway import chains, oversized documents and pathological nesting
//! are cut off here rather than deep inside the resolver.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum XML file size in bytes
    pub max_xml_size: usize,

    /// Maximum element nesting depth per document
    pub max_xml_depth: usize,

    /// Maximum number of files in one closure
    pub max_closure_files: usize,

    /// Maximum number of fixed-point passes before the closure is
    /// declared non-stabilizing
    pub max_closure_passes: usize,

    /// Maximum import/include recursion depth during merge
    pub max_merge_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_xml_depth: 1000,
            max_closure_files: 10000,
            max_closure_passes: 1000,
            max_merge_depth: 100,
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
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_xml_depth: 100,
            max_closure_files: 500,
            max_closure_passes: 100,
            max_merge_depth: 20,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_xml_depth: 10000,
            max_closure_files: 100000,
            max_closure_passes: 10000,
            max_merge_depth: 1000,
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the closure file count is within limits
    pub fn check_closure_files(&self, count: usize) -> Result<()> {
        if count > self.max_closure_files {
            Err(Error::LimitExceeded(format!(
                "closure file count {} exceeds maximum {}",
                count, self.max_closure_files
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the fixed-point pass count is within limits
    pub fn check_closure_passes(&self, passes: usize) -> Result<()> {
        if passes > self.max_closure_passes {
            Err(Error::LimitExceeded(format!(
                "closure did not stabilize after {} passes",
                passes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if merge recursion depth is within limits
    pub fn check_merge_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_merge_depth {
            Err(Error::LimitExceeded(format!(
                "merge depth {} exceeds maximum {}",
                depth, self.max_merge_depth
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(limits.check_xml_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_closure_files < Limits::default().max_closure_files);
        assert!(limits.check_xml_size(11 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_closure_pass_limit() {
        let limits = Limits::default();
        assert!(limits.check_closure_passes(10).is_ok());
        assert!(limits.check_closure_passes(2000).is_err());
    }
}
