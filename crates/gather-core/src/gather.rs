//! The file discovery pipeline.
//!
//! Packages are selected (resolve, expand, drop stdlib), then each package
//! directory goes through match, filter, format and the duplicate check, and
//! every surviving path is written to the output as soon as it is known.

use crate::dupcheck::{DuplicateError, DuplicateRegistry};
use crate::format::{PathError, PathFormatter};
use crate::matcher::{FileMatcher, FilterChain, GlobError};
use crate::options::{GatherOptions, Separator, Targets};
use crate::package::{Package, PackageSet};
use crate::resolve::{ResolveError, Resolver};
use crate::source::PackageSource;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Any failure of a run. All of them are fatal.
#[derive(Error, Debug)]
pub enum GatherError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Select the packages to scan: resolve the specifiers, expand their
/// dependencies unless skipped, and drop standard-library packages unless
/// kept.
///
/// # Errors
///
/// Returns an error if resolution or expansion fails.
pub fn select_packages<S: PackageSource>(
    resolver: &Resolver<S>,
    specifiers: &[String],
    options: &GatherOptions,
) -> Result<PackageSet, ResolveError> {
    let roots = resolver.resolve(specifiers)?;

    let packages = if options.skip_deps {
        roots
    } else {
        resolver.expand(roots)?
    };

    if options.include_stdlib {
        return Ok(packages);
    }

    let before = packages.len();
    let packages = packages.without_stdlib();
    debug!(
        removed = before - packages.len(),
        kept = packages.len(),
        "filtered standard library packages"
    );
    Ok(packages)
}

/// Scans package directories and streams matching paths to a writer.
#[derive(Debug)]
pub struct Gatherer<W> {
    matcher: FileMatcher,
    filters: FilterChain,
    formatter: PathFormatter,
    /// Present only when duplicate checking is on.
    duplicates: Option<DuplicateRegistry>,
    separator: Separator,
    out: W,
    emitted: usize,
}

impl<W: Write> Gatherer<W> {
    /// Build a gatherer for `pattern`.
    ///
    /// Globs are compiled and the relative base resolved here, so bad
    /// options fail before anything is scanned.
    ///
    /// # Errors
    ///
    /// Returns an error if a glob is malformed or the relative base cannot
    /// be resolved.
    pub fn new(pattern: &str, options: &GatherOptions, out: W) -> Result<Self, GatherError> {
        Ok(Self {
            matcher: FileMatcher::new(pattern)?,
            filters: FilterChain::new(options.include_dot_files, &options.exclude)?,
            formatter: PathFormatter::new(&options.relative_to)?,
            duplicates: options.fail_on_duplicate.then(DuplicateRegistry::new),
            separator: options.separator,
            out,
            emitted: 0,
        })
    }

    /// Scan every package in set order.
    ///
    /// Returns the number of paths written by this call.
    ///
    /// # Errors
    ///
    /// Stops at the first failure; paths already written stay written.
    pub fn scan_all(&mut self, packages: &PackageSet) -> Result<usize, GatherError> {
        let mut written = 0;
        for package in packages {
            written += self.scan_package(package)?;
        }
        info!(packages = packages.len(), files = written, "gathered files");
        Ok(written)
    }

    /// Scan one package directory.
    ///
    /// Every path of the package is formatted before any is written, so a
    /// formatting failure writes nothing for that package.
    ///
    /// # Errors
    ///
    /// Returns an error on a path that cannot be formatted, a duplicate
    /// basename, or a failed write.
    pub fn scan_package(&mut self, package: &Package) -> Result<usize, GatherError> {
        if !package.dir.is_dir() {
            warn!(
                package = %package.import_path,
                dir = %package.dir.display(),
                "package directory does not exist"
            );
            return Ok(0);
        }

        let matches = self.matcher.matches_in(&package.dir)?;
        let kept = self.filters.apply(matches);
        let formatted = kept
            .iter()
            .map(|path| self.formatter.format(path))
            .collect::<Result<Vec<PathBuf>, _>>()?;

        debug!(
            package = %package.import_path,
            files = formatted.len(),
            "scanned package"
        );

        for path in &formatted {
            if let Some(ref mut duplicates) = self.duplicates {
                duplicates.register(path)?;
            }
            self.emit(path)?;
        }
        Ok(formatted.len())
    }

    /// Write one record and flush it.
    fn emit(&mut self, path: &Path) -> Result<(), GatherError> {
        self.out.write_all(&path_bytes(path))?;
        self.out.write_all(self.separator.as_bytes())?;
        self.out.flush()?;
        self.emitted += 1;
        Ok(())
    }

    /// Total paths written so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Consume the gatherer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Run the whole pipeline, writing records to `out`.
///
/// Returns the number of paths written.
///
/// # Errors
///
/// Returns the first failure of any stage.
pub fn run<S, W>(
    source: S,
    targets: &Targets,
    options: &GatherOptions,
    out: W,
) -> Result<usize, GatherError>
where
    S: PackageSource,
    W: Write,
{
    let mut gatherer = Gatherer::new(&targets.pattern, options, out)?;
    let resolver = Resolver::new(source).with_tags(options.tags.iter().cloned());
    let packages = select_packages(&resolver, &targets.specifiers, options)?;
    gatherer.scan_all(&packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use std::fs;
    use tempfile::TempDir;

    /// A writer that fails after a number of successful writes.
    struct Failing {
        remaining: usize,
    }

    impl Write for Failing {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.remaining -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn package_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), "").unwrap();
        }
        dir
    }

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn select_keeps_stdlib_when_asked() {
        let source = MemorySource::new()
            .with_package(Package::new("app", "/app").with_imports(["fmt"]))
            .with_package(Package::new("fmt", "/goroot/fmt").standard(true));
        let resolver = Resolver::new(&source);
        let specifiers = vec!["app".to_string()];

        let dropped = select_packages(&resolver, &specifiers, &GatherOptions::default()).unwrap();
        assert_eq!(dropped.import_paths().collect::<Vec<_>>(), vec!["app"]);

        let options = GatherOptions {
            include_stdlib: true,
            ..Default::default()
        };
        let kept = select_packages(&resolver, &specifiers, &options).unwrap();
        assert_eq!(kept.import_paths().collect::<Vec<_>>(), vec!["app", "fmt"]);
    }

    #[test]
    fn stdlib_root_is_dropped_without_deps() {
        let source = MemorySource::new().with_package(Package::new("fmt", "/goroot/fmt").standard(true));
        let resolver = Resolver::new(&source);
        let options = GatherOptions {
            skip_deps: true,
            ..Default::default()
        };

        let selected = select_packages(&resolver, &["fmt".to_string()], &options).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn missing_directory_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let mut gatherer = Gatherer::new("*", &GatherOptions::default(), Vec::new()).unwrap();

        let written = gatherer
            .scan_package(&Package::new("gone", tmp.path().join("gone")))
            .unwrap();
        assert_eq!(written, 0);
        assert!(gatherer.into_inner().is_empty());
    }

    #[test]
    fn nul_separator_terminates_every_record() {
        let tmp = TempDir::new().unwrap();
        let dir = package_dir(tmp.path(), "p", &["a.txt", "b.txt"]);
        let options = GatherOptions {
            separator: Separator::Nul,
            ..Default::default()
        };

        let mut gatherer = Gatherer::new("*.txt", &options, Vec::new()).unwrap();
        gatherer.scan_package(&Package::new("p", &dir)).unwrap();
        let out = gatherer.into_inner();

        let expected = format!(
            "{}\0{}\0",
            dir.join("a.txt").display(),
            dir.join("b.txt").display()
        );
        assert_eq!(out, expected.into_bytes());
    }

    #[test]
    fn relative_output() {
        let tmp = TempDir::new().unwrap();
        let dir = package_dir(tmp.path(), "web/p", &["a.css"]);
        let options = GatherOptions {
            relative_to: tmp.path().to_string_lossy().into_owned(),
            ..Default::default()
        };

        let mut gatherer = Gatherer::new("*.css", &options, Vec::new()).unwrap();
        gatherer.scan_package(&Package::new("p", &dir)).unwrap();

        let expected = Path::new("web").join("p").join("a.css");
        assert_eq!(lines(&gatherer.into_inner()), vec![expected.display().to_string()]);
    }

    #[test]
    fn unformattable_package_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let dir = package_dir(tmp.path(), "p", &["a.css", "b.css"]);
        let options = GatherOptions {
            relative_to: "relative/base".to_string(),
            ..Default::default()
        };

        let mut gatherer = Gatherer::new("*.css", &options, Vec::new()).unwrap();
        let err = gatherer.scan_package(&Package::new("p", &dir)).unwrap_err();

        assert!(matches!(err, GatherError::Path(_)));
        assert_eq!(gatherer.emitted(), 0);
    }

    #[test]
    fn bad_exclude_fails_before_scanning() {
        let options = GatherOptions {
            exclude: "[oops".to_string(),
            ..Default::default()
        };
        let err = Gatherer::new("*", &options, Vec::new()).unwrap_err();
        assert!(matches!(err, GatherError::Glob(_)));
    }

    #[test]
    fn write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let dir = package_dir(tmp.path(), "p", &["a", "b"]);
        let mut gatherer = Gatherer::new("*", &GatherOptions::default(), Failing { remaining: 2 }).unwrap();

        let err = gatherer.scan_package(&Package::new("p", &dir)).unwrap_err();
        assert!(matches!(err, GatherError::Io(_)));
        assert_eq!(gatherer.emitted(), 1);
    }
}
