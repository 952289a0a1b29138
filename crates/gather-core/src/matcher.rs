//! Glob matching inside package directories.
//!
//! Patterns use the `path/filepath.Match` dialect of the Go tool: `*`, `?`,
//! `[...]` classes negated with `^` or `!`, and `\` escapes. They are
//! translated to the `glob` crate's syntax when compiled.

use glob::{MatchOptions, Pattern};
use std::iter::Peekable;
use std::path::{is_separator, Path, PathBuf, MAIN_SEPARATOR};
use thiserror::Error;
use tracing::warn;

/// Basename glob removed by the dot-file stage.
pub const DOTFILE_PATTERN: &str = ".*";

/// Pattern that matches every entry.
pub const MATCH_ALL: &str = "*";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Errors for malformed glob patterns.
#[derive(Error, Debug)]
pub enum GlobError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("invalid glob pattern '{0}': trailing escape")]
    TrailingEscape(String),

    #[error("invalid glob pattern '{0}': malformed character class")]
    BadClass(String),
}

type Chars<'a> = Peekable<std::str::Chars<'a>>;

/// Translate a Go-style glob into `glob` crate syntax.
fn translate(pattern: &str) -> Result<String, GlobError> {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // `**` is recursive in `glob`; here any run of stars is one star.
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                out.push('*');
            }
            '\\' if !cfg!(windows) => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| GlobError::TrailingEscape(pattern.to_string()))?;
                push_literal(&mut out, escaped);
            }
            '[' => translate_class(&mut chars, pattern, &mut out)?,
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if matches!(c, '*' | '?' | '[' | ']') {
        out.push('[');
        out.push(c);
        out.push(']');
    } else {
        out.push(c);
    }
}

/// Read one class character, resolving an escape.
fn class_char(chars: &mut Chars<'_>, pattern: &str) -> Result<char, GlobError> {
    match chars.next() {
        Some('\\') if !cfg!(windows) => chars
            .next()
            .ok_or_else(|| GlobError::TrailingEscape(pattern.to_string())),
        Some(c) if c != '-' && c != ']' => Ok(c),
        _ => Err(GlobError::BadClass(pattern.to_string())),
    }
}

/// Translate a class whose opening `[` has been consumed.
///
/// `glob` has no escapes inside a class, so a literal `]` is moved to the
/// front, a literal `-` to the end, and a leading `!` of a non-negated class
/// further back.
fn translate_class(
    chars: &mut Chars<'_>,
    pattern: &str,
    out: &mut String,
) -> Result<(), GlobError> {
    let bad_class = || GlobError::BadClass(pattern.to_string());
    let negated = chars.next_if(|c| matches!(c, '^' | '!')).is_some();

    let mut close = false;
    let mut dash = false;
    let mut body = String::new();
    let mut bang = String::new();
    loop {
        if (close || dash || !body.is_empty() || !bang.is_empty())
            && chars.next_if_eq(&']').is_some()
        {
            break;
        }
        let lo = class_char(chars, pattern)?;
        let hi = if chars.next_if_eq(&'-').is_some() {
            class_char(chars, pattern)?
        } else {
            lo
        };

        if lo != hi {
            if matches!(lo, '-' | ']') || matches!(hi, '-' | ']') {
                return Err(bad_class());
            }
            let target = if lo == '!' && !negated { &mut bang } else { &mut body };
            target.push(lo);
            target.push('-');
            target.push(hi);
            continue;
        }
        match lo {
            ']' => close = true,
            '-' => dash = true,
            '!' if !negated => bang.push('!'),
            _ => body.push(lo),
        }
    }

    // `glob` reads a leading `!` as negation.
    let bang_leads = !negated && !close && body.is_empty() && !bang.is_empty();
    if bang_leads && !dash {
        if bang.chars().all(|c| c == '!') {
            out.push('!');
            return Ok(());
        }
        return Err(bad_class());
    }

    out.push('[');
    if negated {
        out.push('!');
    }
    if close {
        out.push(']');
    }
    if dash && bang_leads {
        out.push('-');
    }
    out.push_str(&body);
    out.push_str(&bang);
    if dash && !bang_leads {
        out.push('-');
    }
    out.push(']');
    Ok(())
}

/// Compile a Go-style glob.
pub fn compile(pattern: &str) -> Result<Pattern, GlobError> {
    let translated = translate(pattern)?;
    Pattern::new(&translated).map_err(|source| GlobError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Report whether the final component of `path` matches `pattern`.
fn basename_matches(pattern: &Pattern, path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| pattern.matches_with(&name.to_string_lossy(), MATCH_OPTIONS))
}

/// Matches a glob against the entries of a directory.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    /// The pattern as given.
    pattern: String,
    /// The pattern in `glob` crate syntax.
    translated: String,
}

impl FileMatcher {
    /// Compile a matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is malformed.
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let translated = translate(pattern)?;
        Pattern::new(&translated).map_err(|source| GlobError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            translated,
        })
    }

    /// Entries of `dir` matching the pattern, sorted by name.
    ///
    /// A directory that does not exist has no matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined pattern cannot be compiled.
    pub fn matches_in(&self, dir: &Path) -> Result<Vec<PathBuf>, GlobError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        // Joined as text so that a rooted pattern stays under `dir`.
        let escaped = Pattern::escape(&dir.to_string_lossy());
        let full = format!(
            "{}{MAIN_SEPARATOR}{}",
            escaped.trim_end_matches(is_separator),
            self.translated.trim_start_matches(is_separator),
        );

        let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|source| GlobError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => warn!(path = %e.path().display(), error = %e.error(), "skipping unreadable entry"),
            }
        }
        Ok(matches)
    }
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self {
            pattern: MATCH_ALL.to_string(),
            translated: MATCH_ALL.to_string(),
        }
    }
}

/// Exclusion stages applied to matched paths: dot files first, then the
/// caller's exclusion glob.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    dotfiles: Option<Pattern>,
    exclude: Option<Pattern>,
}

impl FilterChain {
    /// Build the chain.
    ///
    /// An empty `exclude` disables the second stage.
    ///
    /// # Errors
    ///
    /// Returns an error if `exclude` is malformed.
    pub fn new(include_dot_files: bool, exclude: &str) -> Result<Self, GlobError> {
        let dotfiles = if include_dot_files {
            None
        } else {
            Some(compile(DOTFILE_PATTERN)?)
        };
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(compile(exclude)?)
        };
        Ok(Self { dotfiles, exclude })
    }

    /// Whether any stage removes `path`.
    #[must_use]
    pub fn excludes(&self, path: &Path) -> bool {
        self.dotfiles
            .iter()
            .chain(self.exclude.iter())
            .any(|pattern| basename_matches(pattern, path))
    }

    /// Remove excluded paths, preserving order.
    #[must_use]
    pub fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.into_iter().filter(|p| !self.excludes(p)).collect()
    }
}
