//! Package descriptors and ordered package sets.
//!
//! A [`PackageSet`] keeps at most one [`Package`] per import path and iterates
//! in insertion order, so output is deterministic for a given resolution.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

/// Import path of the cgo pseudo-package. It has no directory and is never a
/// dependency edge.
pub const CGO_IMPORT: &str = "C";

/// A resolved Go package.
///
/// Field names follow the JSON emitted by `go list -json`, so descriptors
/// can be decoded from it directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    /// Import path, unique within a run.
    pub import_path: String,

    /// Build directory containing the package sources.
    #[serde(default)]
    pub dir: PathBuf,

    /// Direct imports, in declaration order.
    #[serde(default)]
    pub imports: Vec<String>,

    /// Whether the package is part of the standard distribution.
    #[serde(default)]
    pub standard: bool,
}

impl Package {
    /// Create a non-standard package with no imports.
    pub fn new(import_path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            import_path: import_path.into(),
            dir: dir.into(),
            imports: Vec::new(),
            standard: false,
        }
    }

    /// Set the direct imports.
    #[must_use]
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the package as part of the standard distribution.
    #[must_use]
    pub fn standard(mut self, standard: bool) -> Self {
        self.standard = standard;
        self
    }

    /// Direct imports that are real dependency edges.
    pub fn dependency_edges(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .map(String::as_str)
            .filter(|path| *path != CGO_IMPORT)
    }
}

/// Packages keyed by import path, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet {
    packages: IndexMap<String, Package>,
}

impl PackageSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package unless one with the same import path is present.
    ///
    /// Returns true if the package was added.
    pub fn insert(&mut self, package: Package) -> bool {
        if self.packages.contains_key(&package.import_path) {
            return false;
        }
        self.packages.insert(package.import_path.clone(), package);
        true
    }

    /// Append every package of `other` not already present.
    pub fn union(&mut self, other: PackageSet) {
        for package in other {
            self.insert(package);
        }
    }

    /// Whether a package with this import path is present.
    #[must_use]
    pub fn contains(&self, import_path: &str) -> bool {
        self.packages.contains_key(import_path)
    }

    /// Get a package by import path.
    #[must_use]
    pub fn get(&self, import_path: &str) -> Option<&Package> {
        self.packages.get(import_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over packages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Import paths in insertion order.
    pub fn import_paths(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Drop every standard-library package, preserving order.
    #[must_use]
    pub fn without_stdlib(self) -> Self {
        self.into_iter().filter(|p| !p.standard).collect()
    }
}

impl FromIterator<Package> for PackageSet {
    fn from_iter<T: IntoIterator<Item = Package>>(iter: T) -> Self {
        let mut set = Self::new();
        for package in iter {
            set.insert(package);
        }
        set
    }
}

impl IntoIterator for PackageSet {
    type Item = Package;
    type IntoIter = indexmap::map::IntoValues<String, Package>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.into_values()
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a Package;
    type IntoIter = indexmap::map::Values<'a, String, Package>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.values()
    }
}
