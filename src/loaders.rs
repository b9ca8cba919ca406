//! File supply
//!
//! The resolver grows its closure by asking a [`FileSupply`] for the decoded
//! text of a referenced location. Archive unpacking, remote fetching and
//! character-set decoding are caller concerns; two ready-made suppliers
//! cover the common cases (a base directory and an in-memory map).

use crate::error::{Error, Result};
use crate::limits::Limits;
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;

/// Source of decoded document text, keyed by normalized location
pub trait FileSupply {
    /// Return the text behind a location, or `None` when it cannot be found
    fn supply(&self, location: &str) -> Result<Option<String>>;
}

/// File supply rooted at a directory on the local file system
#[derive(Debug)]
pub struct DirSupply {
    base: PathBuf,
    limits: Limits,
}

impl DirSupply {
    /// Create a supply serving files below `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

impl FileSupply for DirSupply {
    fn supply(&self, location: &str) -> Result<Option<String>> {
        let path = self.base.join(location);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
        })?;
        self.limits.check_xml_size(content.len())?;
        Ok(Some(content))
    }
}

/// In-memory file supply
///
/// Useful for tests and for callers that already hold decoded content,
/// e.g. after unpacking an archive.
#[derive(Debug, Default, Clone)]
pub struct MemorySupply {
    files: IndexMap<String, String>,
}

impl MemorySupply {
    /// Create an empty supply
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under a location
    pub fn with_file(mut self, location: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(location.into(), text.into());
        self
    }

    /// Insert a file under a location
    pub fn insert(&mut self, location: impl Into<String>, text: impl Into<String>) {
        self.files.insert(location.into(), text.into());
    }

    /// Locations currently held, in insertion order
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|k| k.as_str())
    }
}

impl FileSupply for MemorySupply {
    fn supply(&self, location: &str) -> Result<Option<String>> {
        Ok(self.files.get(location).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_supply() {
        let supply = MemorySupply::new().with_file("a.wsdl", "<definitions/>");
        assert_eq!(
            supply.supply("a.wsdl").unwrap().as_deref(),
            Some("<definitions/>")
        );
        assert!(supply.supply("b.wsdl").unwrap().is_none());
    }

    #[test]
    fn test_dir_supply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xsd");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "<schema/>").unwrap();

        let supply = DirSupply::new(dir.path());
        let text = supply.supply("t.xsd").unwrap().unwrap();
        assert!(text.contains("<schema/>"));
        assert!(supply.supply("absent.xsd").unwrap().is_none());
    }

    #[test]
    fn test_dir_supply_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xsd");
        fs::write(&path, "x".repeat(11 * 1024 * 1024)).unwrap();

        let supply = DirSupply::new(dir.path()).with_limits(Limits::strict());
        assert!(supply.supply("big.xsd").is_err());
    }
}
