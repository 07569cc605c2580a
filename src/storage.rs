//! Filesystem access used by the orchestrator.
//!
//! Listing, directory creation and deletion go through [`Storage`] so hosts
//! with tiered or remote storage can plug in their own provider and tests can
//! simulate failures. Artifact files themselves are written by the
//! converter backends.

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage provider seen by the orchestrator.
pub trait Storage: Send + Sync {
    /// Regular files directly inside `dir`, in enumeration order.
    ///
    /// A missing directory yields an empty list.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StorageError>;

    fn exists(&self, path: &Path) -> bool;

    /// Create `dir` and all missing parents.
    fn create_dirs(&self, dir: &Path) -> Result<(), StorageError>;

    fn delete_file(&self, path: &Path) -> Result<(), StorageError>;
}

/// [`Storage`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Source directory {} does not exist", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dirs(&self, dir: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let files = LocalStorage.list_files(&tmp.path().join("absent")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn lists_only_regular_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let files = LocalStorage.list_files(tmp.path()).unwrap();
        assert_eq!(files, vec![tmp.path().join("a.pdf")]);
    }

    #[test]
    fn listing_a_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(LocalStorage.list_files(&file).is_err());
    }

    #[test]
    fn create_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a/b/c");
        LocalStorage.create_dirs(&dir).unwrap();
        assert!(LocalStorage.exists(&dir));

        let file = dir.join("x.tif");
        std::fs::write(&file, b"II*").unwrap();
        LocalStorage.delete_file(&file).unwrap();
        assert!(!LocalStorage.exists(&file));
    }
}
