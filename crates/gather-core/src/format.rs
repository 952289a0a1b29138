//! Output path formatting.
//!
//! Paths are printed as produced by the matcher, or rewritten relative to a
//! base directory. Relative paths are computed lexically; nothing is looked
//! up on disk.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while formatting paths.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("cannot make {} relative to {}", .target.display(), .base.display())]
    NotRelative { base: PathBuf, target: PathBuf },

    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Lexically simplify a path: drop `.` components and resolve `..` against
/// preceding names. An empty result is `.`.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `..` at the root is the root
                Some(Component::RootDir) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Compute `target` relative to `base`, so that joining the result onto
/// `base` names `target`.
///
/// # Errors
///
/// Returns an error if the paths have different roots (one absolute and one
/// relative, or different drive prefixes), or if `base` has unresolvable
/// `..` components past the common prefix.
pub fn relative_path(base: &Path, target: &Path) -> Result<PathBuf, PathError> {
    let not_relative = || PathError::NotRelative {
        base: base.to_path_buf(),
        target: target.to_path_buf(),
    };

    let base_clean = clean(base);
    let target_clean = clean(target);
    if base_clean == target_clean {
        return Ok(PathBuf::from("."));
    }

    let base_parts: Vec<Component<'_>> = base_clean
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();
    let target_parts: Vec<Component<'_>> = target_clean
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    if anchor(&base_parts) != anchor(&target_parts) {
        return Err(not_relative());
    }

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(b, t)| b == t)
        .count();

    let remaining = &base_parts[common..];
    if remaining.contains(&Component::ParentDir) {
        return Err(not_relative());
    }

    let mut relative = PathBuf::new();
    for _ in remaining {
        relative.push("..");
    }
    for component in &target_parts[common..] {
        relative.push(component.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(relative)
}

/// Leading prefix and root components.
fn anchor<'a>(parts: &'a [Component<'a>]) -> &'a [Component<'a>] {
    let len = parts
        .iter()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .count();
    &parts[..len]
}

/// Rewrites matched paths for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFormatter {
    /// Print paths unchanged.
    Identity,
    /// Print paths relative to a base directory.
    Relative(PathBuf),
}

impl PathFormatter {
    /// Build a formatter for a base given on the command line.
    ///
    /// An empty base prints paths unchanged. The base is cleaned, and `.`
    /// becomes the current directory, read once here.
    ///
    /// # Errors
    ///
    /// Returns an error if the base is `.` and the current directory cannot
    /// be determined.
    pub fn new(base: &str) -> Result<Self, PathError> {
        if base.is_empty() {
            return Ok(Self::Identity);
        }

        let base = clean(Path::new(base));
        if base == Path::new(".") {
            let cwd = std::env::current_dir().map_err(PathError::CurrentDir)?;
            return Ok(Self::Relative(cwd));
        }
        Ok(Self::Relative(base))
    }

    /// Format a single path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be made relative to the base.
    pub fn format(&self, path: &Path) -> Result<PathBuf, PathError> {
        match self {
            Self::Identity => Ok(path.to_path_buf()),
            Self::Relative(base) => relative_path(base, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(base: &str, target: &str) -> Result<PathBuf, PathError> {
        relative_path(Path::new(base), Path::new(target))
    }

    #[test]
    fn clean_simplifies() {
        assert_eq!(clean(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean(Path::new("./")), PathBuf::from("."));
        assert_eq!(clean(Path::new("../a/..")), PathBuf::from(".."));
    }

    #[cfg(unix)]
    #[test]
    fn clean_stops_at_root() {
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("/srv/app/")), PathBuf::from("/srv/app"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_descendant() {
        assert_eq!(rel("/srv", "/srv/app/a.css").unwrap(), PathBuf::from("app/a.css"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_sibling_subtree() {
        assert_eq!(
            rel("/srv/app/web", "/srv/lib/b.css").unwrap(),
            PathBuf::from("../../lib/b.css")
        );
    }

    #[cfg(unix)]
    #[test]
    fn relative_same_path() {
        assert_eq!(rel("/srv/app", "/srv/app/").unwrap(), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn relative_rejects_mixed_roots() {
        assert!(matches!(rel("srv", "/srv/a"), Err(PathError::NotRelative { .. })));
        assert!(matches!(rel("/srv", "srv/a"), Err(PathError::NotRelative { .. })));
    }

    #[test]
    fn relative_rejects_unresolvable_parent() {
        assert!(rel("../up", "here/a").is_err());
        assert_eq!(rel("a", "../b").unwrap(), PathBuf::from("../../b"));
    }

    #[cfg(unix)]
    #[test]
    fn round_trip_for_descendants() {
        let base = Path::new("/home/dev/go/src");
        for target in [
            "/home/dev/go/src/example.com/app/a.css",
            "/home/dev/go/src/b.css",
            "/home/dev/go/src/x/y/z/c.go",
        ] {
            let target = Path::new(target);
            let relative = relative_path(base, target).unwrap();
            assert!(relative.is_relative());
            assert_eq!(clean(&base.join(&relative)), target);
        }
    }

    #[test]
    fn empty_base_is_identity() {
        let formatter = PathFormatter::new("").unwrap();
        assert_eq!(formatter, PathFormatter::Identity);
        assert_eq!(
            formatter.format(Path::new("/srv/a.css")).unwrap(),
            PathBuf::from("/srv/a.css")
        );
    }

    #[test]
    fn dot_base_is_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(PathFormatter::new(".").unwrap(), PathFormatter::Relative(cwd.clone()));
        assert_eq!(PathFormatter::new("./").unwrap(), PathFormatter::Relative(cwd.clone()));

        let formatted = PathFormatter::new(".")
            .unwrap()
            .format(&cwd.join("sub/file.txt"))
            .unwrap();
        assert_eq!(formatted, Path::new("sub").join("file.txt"));
    }

    #[test]
    fn base_is_cleaned() {
        assert_eq!(
            PathFormatter::new("srv/./app/").unwrap(),
            PathFormatter::Relative(PathBuf::from("srv/app"))
        );
    }
}
