//! Detection of files that share a basename across package directories.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Two emitted files share a basename.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "duplicate file {} found at\n\t{}\npreviously\n\t{}",
    .name.to_string_lossy(),
    .path.display(),
    .previous.display()
)]
pub struct DuplicateError {
    /// The shared basename.
    pub name: OsString,
    /// The path being registered.
    pub path: PathBuf,
    /// The path registered first.
    pub previous: PathBuf,
}

/// Basenames seen so far, each mapped to the first path that used it.
#[derive(Debug, Default)]
pub struct DuplicateRegistry {
    seen: HashMap<OsString, PathBuf>,
}

impl DuplicateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path, failing if its basename is already taken.
    ///
    /// A path with no final component (such as `/` or `..`) is keyed by the
    /// whole path.
    ///
    /// # Errors
    ///
    /// Returns a [`DuplicateError`] naming both paths when the basename was
    /// registered before. The registry is left unchanged.
    pub fn register(&mut self, path: &Path) -> Result<(), DuplicateError> {
        let name = path
            .file_name()
            .map_or_else(|| path.as_os_str().to_os_string(), |n| n.to_os_string());

        if let Some(previous) = self.seen.get(&name) {
            return Err(DuplicateError {
                name,
                path: path.to_path_buf(),
                previous: previous.clone(),
            });
        }

        self.seen.insert(name, path.to_path_buf());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_basename_collides() {
        let mut registry = DuplicateRegistry::new();
        registry.register(Path::new("/a/x.txt")).unwrap();

        let err = registry.register(Path::new("/b/x.txt")).unwrap_err();
        assert_eq!(err.name, OsString::from("x.txt"));
        assert_eq!(err.path, PathBuf::from("/b/x.txt"));
        assert_eq!(err.previous, PathBuf::from("/a/x.txt"));

        let message = err.to_string();
        assert!(message.contains("x.txt"));
        assert!(message.contains("/a/x.txt"));
        assert!(message.contains("/b/x.txt"));
    }

    #[test]
    fn distinct_basenames_register() {
        let mut registry = DuplicateRegistry::new();
        registry.register(Path::new("/a/x.txt")).unwrap();
        registry.register(Path::new("/a/y.txt")).unwrap();
        registry.register(Path::new("rel/z.txt")).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn failed_registration_keeps_first_path() {
        let mut registry = DuplicateRegistry::new();
        registry.register(Path::new("/a/x.txt")).unwrap();
        registry.register(Path::new("/b/x.txt")).unwrap_err();

        let err = registry.register(Path::new("/c/x.txt")).unwrap_err();
        assert_eq!(err.previous, PathBuf::from("/a/x.txt"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn basename_comparison_is_case_sensitive() {
        let mut registry = DuplicateRegistry::new();
        registry.register(Path::new("/a/Readme.md")).unwrap();
        registry.register(Path::new("/b/README.md")).unwrap();
    }
}
