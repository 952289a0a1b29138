//! Package resolution and dependency closure.
//!
//! This module provides:
//! - Resolution of user specifiers (including `...` wildcards) to packages
//! - Breadth-first expansion of a package set over its import edges

use crate::package::{Package, PackageSet};
use crate::source::{PackageSource, SourceError, CURRENT_DIR};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during package resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A specifier could not be resolved.
    #[error("cannot resolve '{specifier}': {source}")]
    Resolution {
        specifier: String,
        source: SourceError,
    },

    /// A wildcard specifier matched nothing.
    #[error("'{0}' matched no packages")]
    NoMatches(String),

    /// Loading a wave of dependencies failed.
    #[error("cannot load dependencies {}: {source}", .import_paths.join(", "))]
    Closure {
        import_paths: Vec<String>,
        source: SourceError,
    },

    /// The provider did not return a requested dependency.
    #[error("dependency '{import_path}' of '{importer}' not found")]
    MissingDependency {
        import_path: String,
        importer: String,
    },
}

impl ResolveError {
    /// Whether the failure happened while expanding dependencies rather than
    /// resolving the specifiers themselves.
    #[must_use]
    pub fn is_closure(&self) -> bool {
        matches!(self, Self::Closure { .. } | Self::MissingDependency { .. })
    }
}

/// Resolves specifiers and dependency closures against a [`PackageSource`].
#[derive(Debug)]
pub struct Resolver<S> {
    source: S,
    /// Build tags passed to every load.
    tags: Vec<String>,
}

impl<S: PackageSource> Resolver<S> {
    /// Create a resolver with no build tags.
    pub fn new(source: S) -> Self {
        Self {
            source,
            tags: Vec::new(),
        }
    }

    /// Set the build tags used for every lookup.
    #[must_use]
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The build tags in effect.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Resolve specifiers to their packages.
    ///
    /// An empty specifier list means the package in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A specifier names a package the source cannot find
    /// - A wildcard specifier matches no packages
    pub fn resolve(&self, specifiers: &[String]) -> Result<PackageSet, ResolveError> {
        let current = [CURRENT_DIR.to_string()];
        let specifiers = if specifiers.is_empty() {
            &current[..]
        } else {
            specifiers
        };

        let mut roots = PackageSet::new();
        for specifier in specifiers {
            let packages = self
                .source
                .load(std::slice::from_ref(specifier), &self.tags)
                .map_err(|source| ResolveError::Resolution {
                    specifier: specifier.clone(),
                    source,
                })?;

            if packages.is_empty() {
                return Err(ResolveError::NoMatches(specifier.clone()));
            }

            debug!(%specifier, count = packages.len(), "resolved specifier");
            roots.union(packages.into_iter().collect());
        }

        info!(count = roots.len(), "resolved root packages");
        Ok(roots)
    }

    /// Expand a package set to everything reachable over import edges.
    ///
    /// Each wave loads all not-yet-seen imports of the previous wave in a
    /// single call, so no import path is requested twice.
    ///
    /// # Errors
    ///
    /// Returns an error if a wave cannot be loaded or a requested dependency
    /// is absent from the source's answer.
    pub fn expand(&self, roots: PackageSet) -> Result<PackageSet, ResolveError> {
        let mut closure = roots;
        let mut frontier = next_frontier(&closure, closure.iter());
        let mut wave = 0usize;

        while !frontier.is_empty() {
            wave += 1;
            let requested: Vec<String> = frontier.keys().cloned().collect();
            debug!(wave, count = requested.len(), "loading dependency wave");

            let loaded = self
                .source
                .load(&requested, &self.tags)
                .map_err(|source| ResolveError::Closure {
                    import_paths: requested.clone(),
                    source,
                })?;

            let mut added = Vec::with_capacity(loaded.len());
            for package in loaded {
                let import_path = package.import_path.clone();
                if closure.insert(package) {
                    added.push(import_path);
                }
            }

            if let Some((import_path, importer)) =
                frontier.iter().find(|(path, _)| !closure.contains(path))
            {
                return Err(ResolveError::MissingDependency {
                    import_path: import_path.clone(),
                    importer: importer.clone(),
                });
            }

            frontier = next_frontier(&closure, added.iter().filter_map(|p| closure.get(p)));
        }

        info!(count = closure.len(), waves = wave, "expanded dependency closure");
        Ok(closure)
    }
}

/// Imports of `packages` not yet in `closure`, each mapped to the first
/// package that imports it.
fn next_frontier<'a>(
    closure: &PackageSet,
    packages: impl Iterator<Item = &'a Package>,
) -> IndexMap<String, String> {
    let mut frontier = IndexMap::new();
    for package in packages {
        for import in package.dependency_edges() {
            if !closure.contains(import) && !frontier.contains_key(import) {
                frontier.insert(import.to_string(), package.import_path.clone());
            }
        }
    }
    frontier
}
