//! Run configuration.
//!
//! Options come from the command line and, optionally, a TOML file:
//!
//! ```toml
//! stdlib = false
//! no-deps = false
//! exclude = "doc*.go"
//! rel = "."
//! print0 = false
//! dot = false
//! fail-on-dup = true
//! tags = ["integration"]
//! go = "/usr/local/go/bin/go"
//! ```

use crate::matcher::MATCH_ALL;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Terminator written after every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Separator {
    #[default]
    Newline,
    /// NUL, for file names containing newlines.
    Nul,
}

impl Separator {
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Newline => b"\n",
            Self::Nul => b"\0",
        }
    }
}

/// Options controlling a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherOptions {
    /// Keep standard-library packages.
    pub include_stdlib: bool,
    /// Scan only the named packages, not their dependencies.
    pub skip_deps: bool,
    /// Basename glob of files to drop; empty for none.
    pub exclude: String,
    /// Print paths relative to this directory; empty for unchanged paths.
    pub relative_to: String,
    /// Record terminator.
    pub separator: Separator,
    /// Keep files whose names start with a dot.
    pub include_dot_files: bool,
    /// Fail when two printed files share a basename.
    pub fail_on_duplicate: bool,
    /// Build tags for package resolution.
    pub tags: Vec<String>,
}

impl GatherOptions {
    /// Fill in values from a configuration file.
    ///
    /// Values already set take precedence: flags that are on stay on, non-empty
    /// strings are kept, and tags are merged.
    pub fn merge_file(&mut self, file: &ConfigFile) {
        self.include_stdlib |= file.stdlib.unwrap_or(false);
        self.skip_deps |= file.no_deps.unwrap_or(false);
        self.include_dot_files |= file.dot.unwrap_or(false);
        self.fail_on_duplicate |= file.fail_on_dup.unwrap_or(false);
        if file.print0.unwrap_or(false) {
            self.separator = Separator::Nul;
        }

        if self.exclude.is_empty() {
            if let Some(ref exclude) = file.exclude {
                self.exclude.clone_from(exclude);
            }
        }
        if self.relative_to.is_empty() {
            if let Some(ref rel) = file.rel {
                self.relative_to.clone_from(rel);
            }
        }

        for tag in &file.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
    }
}

/// Split a build tag list given as one string, separated by commas or
/// whitespace.
pub fn split_tags(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tag| !tag.is_empty())
}

/// A configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigFile {
    pub stdlib: Option<bool>,
    pub no_deps: Option<bool>,
    pub exclude: Option<String>,
    pub rel: Option<String>,
    pub print0: Option<bool>,
    pub dot: Option<bool>,
    pub fail_on_dup: Option<bool>,
    pub tags: Vec<String>,
    /// The Go tool to run.
    pub go: Option<PathBuf>,
}

impl ConfigFile {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| OptionsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a configuration file from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// The glob pattern and package specifiers of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub pattern: String,
    pub specifiers: Vec<String>,
}

impl Targets {
    /// Split positional arguments: the first is the pattern when any are
    /// given, the rest are specifiers. With none, every file of the current
    /// directory's package is matched.
    #[must_use]
    pub fn from_args(mut args: Vec<String>) -> Self {
        if args.is_empty() {
            return Self {
                pattern: MATCH_ALL.to_string(),
                specifiers: Vec::new(),
            };
        }
        let pattern = args.remove(0);
        Self {
            pattern,
            specifiers: args,
        }
    }
}
