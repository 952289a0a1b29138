//! File discovery over the dependency closure of Go packages.
//!
//! This crate provides:
//! - Resolution of import specifiers, including `...` wildcards
//! - Dependency closure expansion and standard-library filtering
//! - Glob matching inside package directories with dot-file and exclusion
//!   filters
//! - Absolute or relative output paths, with optional duplicate detection
//! - A streaming pipeline tying the stages together

mod dupcheck;
mod format;
mod gather;
mod matcher;
mod options;
mod package;
mod resolve;
mod source;

pub use dupcheck::{DuplicateError, DuplicateRegistry};
pub use format::{clean, relative_path, PathError, PathFormatter};
pub use gather::{run, select_packages, GatherError, Gatherer};
pub use matcher::{compile, FileMatcher, FilterChain, GlobError, DOTFILE_PATTERN, MATCH_ALL};
pub use options::{split_tags, ConfigFile, GatherOptions, OptionsError, Separator, Targets};
pub use package::{Package, PackageSet, CGO_IMPORT};
pub use resolve::{ResolveError, Resolver};
pub use source::{
    decode_packages, matches_import_pattern, GoList, MemorySource, PackageSource, SourceError,
    CURRENT_DIR, WILDCARD,
};

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
