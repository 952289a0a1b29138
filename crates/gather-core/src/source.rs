//! Package metadata providers.
//!
//! [`GoList`] asks the Go tool for package metadata. [`MemorySource`] serves
//! a fixed package index and is used wherever a Go installation is not
//! wanted.

use crate::package::Package;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Specifier naming the package in the current directory.
pub const CURRENT_DIR: &str = ".";

/// Wildcard used in import path patterns.
pub const WILDCARD: &str = "...";

/// Errors reported by a package metadata provider.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{} list failed: {stderr}", .program.display())]
    Failed { program: PathBuf, stderr: String },

    #[error("failed to decode package metadata: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cannot find package \"{0}\"")]
    UnknownPackage(String),
}

/// A provider of package metadata.
pub trait PackageSource {
    /// Load the packages named by `patterns` under the given build tags.
    ///
    /// Patterns are import paths, relative directory paths, or either of
    /// those containing the `...` wildcard. A pattern that matches nothing
    /// yields no packages rather than an error; an import path that does not
    /// exist is an error.
    fn load(&self, patterns: &[String], tags: &[String]) -> Result<Vec<Package>, SourceError>;
}

impl<S: PackageSource + ?Sized> PackageSource for &S {
    fn load(&self, patterns: &[String], tags: &[String]) -> Result<Vec<Package>, SourceError> {
        (**self).load(patterns, tags)
    }
}

/// Metadata from `go list -json`.
#[derive(Debug, Clone)]
pub struct GoList {
    /// The Go tool to run.
    program: PathBuf,
}

impl Default for GoList {
    fn default() -> Self {
        Self::new("go")
    }
}

impl GoList {
    /// Use the given Go tool.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the Go tool for a load.
    fn args(patterns: &[String], tags: &[String]) -> Vec<String> {
        let mut args = vec!["list".to_string(), "-json".to_string()];
        if !tags.is_empty() {
            args.push(format!("-tags={}", tags.join(",")));
        }
        args.extend(patterns.iter().cloned());
        args
    }
}

impl PackageSource for GoList {
    fn load(&self, patterns: &[String], tags: &[String]) -> Result<Vec<Package>, SourceError> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let args = Self::args(patterns, tags);
        debug!(program = %self.program.display(), ?args, "running go list");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| SourceError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SourceError::Failed {
                program: self.program.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        decode_packages(&output.stdout)
    }
}

/// Decode the stream of concatenated JSON objects printed by `go list -json`.
pub fn decode_packages(bytes: &[u8]) -> Result<Vec<Package>, SourceError> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Package>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(SourceError::from)
}

/// Report whether an import path matches a pattern, where `...` matches any
/// string and a trailing `/...` also matches the bare prefix.
#[must_use]
pub fn matches_import_pattern(pattern: &str, import_path: &str) -> bool {
    if !pattern.contains(WILDCARD) {
        return pattern == import_path;
    }

    if let Some(prefix) = pattern.strip_suffix("/...") {
        if !prefix.contains(WILDCARD) && import_path == prefix {
            return true;
        }
    }

    let mut pieces = pattern.split(WILDCARD);
    let first = pieces.next().unwrap_or_default();
    let Some(mut rest) = import_path.strip_prefix(first) else {
        return false;
    };

    let pieces: Vec<&str> = pieces.collect();
    let Some((last, middle)) = pieces.split_last() else {
        return rest.is_empty();
    };

    for piece in middle {
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// A fixed in-memory package index.
///
/// Build tags are ignored. Wildcard patterns are expanded in import path
/// order, the way `go list` sorts its results.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    packages: BTreeMap<String, Package>,
    current: Option<String>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package to the index, replacing any with the same import path.
    #[must_use]
    pub fn with_package(mut self, package: Package) -> Self {
        self.add(package);
        self
    }

    /// Make `import_path` the package named by the `.` specifier.
    #[must_use]
    pub fn with_current(mut self, import_path: impl Into<String>) -> Self {
        self.current = Some(import_path.into());
        self
    }

    /// Add a package to the index, replacing any with the same import path.
    pub fn add(&mut self, package: Package) {
        self.packages.insert(package.import_path.clone(), package);
    }

    fn lookup(&self, pattern: &str) -> Result<Vec<Package>, SourceError> {
        if pattern == CURRENT_DIR {
            return self
                .current
                .as_deref()
                .and_then(|path| self.packages.get(path))
                .cloned()
                .map(|package| vec![package])
                .ok_or_else(|| SourceError::UnknownPackage(pattern.to_string()));
        }

        if pattern.contains(WILDCARD) {
            return Ok(self
                .packages
                .values()
                .filter(|p| matches_import_pattern(pattern, &p.import_path))
                .cloned()
                .collect());
        }

        self.packages
            .get(pattern)
            .cloned()
            .map(|package| vec![package])
            .ok_or_else(|| SourceError::UnknownPackage(pattern.to_string()))
    }
}

impl PackageSource for MemorySource {
    fn load(&self, patterns: &[String], _tags: &[String]) -> Result<Vec<Package>, SourceError> {
        let mut packages: Vec<Package> = Vec::new();
        for pattern in patterns {
            for package in self.lookup(pattern)? {
                if !packages.iter().any(|p| p.import_path == package.import_path) {
                    packages.push(package);
                }
            }
        }
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> MemorySource {
        MemorySource::new()
            .with_package(Package::new("example.com/app", "/src/app"))
            .with_package(Package::new("example.com/app/internal/db", "/src/app/internal/db"))
            .with_package(Package::new("example.com/apple", "/src/apple"))
            .with_package(Package::new("example.com/lib", "/src/lib"))
            .with_current("example.com/lib")
    }

    fn load(source: &MemorySource, patterns: &[&str]) -> Result<Vec<String>, SourceError> {
        let patterns: Vec<String> = patterns.iter().map(|p| (*p).to_string()).collect();
        Ok(source
            .load(&patterns, &[])?
            .into_iter()
            .map(|p| p.import_path)
            .collect())
    }

    #[test]
    fn pattern_without_wildcard_is_exact() {
        assert!(matches_import_pattern("example.com/app", "example.com/app"));
        assert!(!matches_import_pattern("example.com/app", "example.com/apple"));
    }

    #[test]
    fn trailing_wildcard_matches_prefix_and_subtree() {
        assert!(matches_import_pattern("example.com/app/...", "example.com/app"));
        assert!(matches_import_pattern(
            "example.com/app/...",
            "example.com/app/internal/db"
        ));
        assert!(!matches_import_pattern("example.com/app/...", "example.com/apple"));
    }

    #[test]
    fn inner_wildcard_matches_any_run() {
        assert!(matches_import_pattern("example.com/.../db", "example.com/app/internal/db"));
        assert!(matches_import_pattern("example.com/app...", "example.com/apple"));
        assert!(!matches_import_pattern("example.com/.../db", "example.com/app/internal/dbx"));
    }

    #[test]
    fn memory_source_expands_wildcards_in_order() {
        let names = load(&index(), &["example.com/app/..."]).unwrap();
        assert_eq!(names, vec!["example.com/app", "example.com/app/internal/db"]);
    }

    #[test]
    fn memory_source_resolves_current_dir() {
        let names = load(&index(), &["."]).unwrap();
        assert_eq!(names, vec!["example.com/lib"]);
    }

    #[test]
    fn memory_source_rejects_unknown_paths() {
        let err = load(&index(), &["example.com/missing"]).unwrap_err();
        assert!(matches!(err, SourceError::UnknownPackage(ref p) if p == "example.com/missing"));
    }

    #[test]
    fn memory_source_empty_wildcard_is_not_an_error() {
        let names = load(&index(), &["example.com/none/..."]).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn go_list_args_include_tags() {
        let args = GoList::args(
            &["./...".to_string()],
            &["integration".to_string(), "netgo".to_string()],
        );
        assert_eq!(args, vec!["list", "-json", "-tags=integration,netgo", "./..."]);
    }

    #[test]
    fn go_list_args_without_tags() {
        let args = GoList::args(&["fmt".to_string(), "os".to_string()], &[]);
        assert_eq!(args, vec!["list", "-json", "fmt", "os"]);
    }

    #[test]
    fn decode_concatenated_objects() {
        let stream = br#"{"ImportPath": "a", "Dir": "/a", "Imports": ["b"]}
{"ImportPath": "b", "Dir": "/b", "Standard": true}
"#;
        let packages = decode_packages(stream).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].imports, vec!["b"]);
        assert!(packages[1].standard);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_packages(b"not json"),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn missing_go_tool_is_a_spawn_error() {
        let source = GoList::new("/nonexistent/bin/go-for-gather-tests");
        let err = source.load(&[".".to_string()], &[]).unwrap_err();
        assert!(matches!(err, SourceError::Spawn { .. }));
    }
}
