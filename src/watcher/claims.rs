//! Duplicate guard for discovered files.
//!
//! The same file can be reported twice: once by the startup scan and again
//! by a creation event queued while the scan ran, or by a create followed by
//! a rename. After a file reaches a terminal state the registry remembers its
//! fingerprint (size and modification time). A later report for the same
//! path is a duplicate while the fingerprint is unchanged, and is ignored
//! when the file is gone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pipeline::Fingerprint;

/// Whether a reported path should be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// New or changed file: process it.
    Accepted,
    /// Already handled and unchanged since.
    Duplicate,
    /// No regular file at this path (already relocated, or a directory).
    Missing,
}

/// Registry of settled files keyed by path.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    settled: HashMap<PathBuf, Fingerprint>,
}

impl ClaimRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `path` needs processing.
    pub async fn claim(&self, path: &Path) -> Claim {
        match Fingerprint::read(path).await {
            None => Claim::Missing,
            Some(current) if self.settled.get(path) == Some(&current) => Claim::Duplicate,
            Some(_) => Claim::Accepted,
        }
    }

    /// Record the state `path` was left in after processing.
    ///
    /// Files that left the inbox are forgotten.
    pub async fn settle(&mut self, path: &Path) {
        match Fingerprint::read(path).await {
            Some(fingerprint) => {
                self.settled.insert(path.to_path_buf(), fingerprint);
            }
            None => {
                self.settled.remove(path);
            }
        }
    }

    /// Number of files left behind in the inbox after processing.
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unknown_file_is_accepted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.pdf");
        fs::write(&path, b"abc").unwrap();

        let registry = ClaimRegistry::new();
        assert_eq!(registry.claim(&path).await, Claim::Accepted);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_settled_unchanged_file_is_duplicate() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.pdf");
        fs::write(&path, b"abc").unwrap();

        let mut registry = ClaimRegistry::new();
        registry.settle(&path).await;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.claim(&path).await, Claim::Duplicate);
    }

    #[tokio::test]
    async fn test_changed_file_is_accepted_again() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.pdf");
        fs::write(&path, b"abc").unwrap();

        let mut registry = ClaimRegistry::new();
        registry.settle(&path).await;

        // Different length guarantees a different fingerprint
        fs::write(&path, b"abcdef").unwrap();
        assert_eq!(registry.claim(&path).await, Claim::Accepted);
    }

    #[tokio::test]
    async fn test_relocated_file_is_missing_and_forgotten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.pdf");
        fs::write(&path, b"abc").unwrap();

        let mut registry = ClaimRegistry::new();
        registry.settle(&path).await;
        fs::remove_file(&path).unwrap();

        assert_eq!(registry.claim(&path).await, Claim::Missing);
        registry.settle(&path).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_directory_is_missing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("folder.pdf");
        fs::create_dir(&dir).unwrap();

        assert_eq!(ClaimRegistry::new().claim(&dir).await, Claim::Missing);
    }
}
