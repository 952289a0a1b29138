//! gather - list files matching a glob in the transitive closure of a Go
//! package's dependencies.

use anyhow::{Context, Result};
use clap::Parser;
use gather_core::{
    split_tags, ConfigFile, GatherOptions, GoList, PackageSource, Separator, Targets,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

mod logging;

const LONG_ABOUT: &str = "\
Lists the files in Go package directories that match a glob pattern.

Packages are given as import paths, including the ... wildcard. With no
packages, the package in the current directory is used. Dependencies of the
packages are scanned too, except standard library packages.

The default pattern is \"*\"; to name packages, give the pattern first.
Dot files are skipped unless --dot is given.";

#[derive(Parser, Debug)]
#[command(name = "gather")]
#[command(version = gather_core::VERSION)]
#[command(about = "Gather files matching a glob across Go package dependencies")]
#[command(long_about = LONG_ABOUT)]
struct Cli {
    /// Include standard library packages in the search
    #[arg(long)]
    stdlib: bool,

    /// Do not search dependencies of the specified packages
    #[arg(long)]
    no_deps: bool,

    /// Glob of files to exclude
    #[arg(long, value_name = "GLOB")]
    exclude: Option<String>,

    /// Print all results relative to a given directory
    #[arg(long, value_name = "DIR")]
    rel: Option<String>,

    /// Separate file names by NUL
    #[arg(long)]
    print0: bool,

    /// Include dot files
    #[arg(short = 'a', long)]
    dot: bool,

    /// Fail if two files have the same name
    #[arg(long)]
    fail_on_dup: bool,

    /// Build tags to consider, comma or space separated
    #[arg(long, value_name = "LIST")]
    tags: Vec<String>,

    /// Read options from a TOML file; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// The Go tool used to load package metadata
    #[arg(long, env = "GATHER_GO", value_name = "PATH")]
    go: Option<PathBuf>,

    /// Log progress to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Glob pattern, followed by import paths
    #[arg(value_name = "PATTERN [IMPORT_PATH]...")]
    args: Vec<String>,
}

/// Everything a run needs, after merging the config file.
#[derive(Debug)]
struct Invocation {
    options: GatherOptions,
    go: PathBuf,
    targets: Targets,
}

impl Cli {
    fn into_invocation(self) -> Result<Invocation> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.tags.iter().flat_map(|list| split_tags(list)) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        let mut options = GatherOptions {
            include_stdlib: self.stdlib,
            skip_deps: self.no_deps,
            exclude: self.exclude.unwrap_or_default(),
            relative_to: self.rel.unwrap_or_default(),
            separator: if self.print0 {
                Separator::Nul
            } else {
                Separator::Newline
            },
            include_dot_files: self.dot,
            fail_on_duplicate: self.fail_on_dup,
            tags,
        };

        let mut go = self.go;
        if let Some(ref path) = self.config {
            let file = ConfigFile::from_path(path)?;
            options.merge_file(&file);
            go = go.or(file.go);
        }

        Ok(Invocation {
            options,
            go: go.unwrap_or_else(|| PathBuf::from("go")),
            targets: Targets::from_args(self.args),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let invocation = cli.into_invocation()?;
    debug!(?invocation, "starting");

    let source = GoList::new(&invocation.go);
    execute(&source, &invocation, io::stdout().lock())?;

    Ok(())
}

/// Run an invocation against `source`, writing records to `out`.
///
/// Errors returned from here end the process with a non-zero status and the
/// error chain on stderr.
fn execute<S: PackageSource>(
    source: &S,
    invocation: &Invocation,
    out: impl Write,
) -> Result<usize> {
    gather_core::run(source, &invocation.targets, &invocation.options, out)
        .context("gather failed")
}
