//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::{Priority, SortPolicy};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Build versioned documentation sites from git branches and tags
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Make this the current working directory before running
    #[arg(short = 'c', long)]
    pub chdir: Option<PathBuf>,

    /// Path to the local git repository (default: discovered from the working directory)
    #[arg(short = 'g', long)]
    pub git_root: Option<PathBuf>,

    /// Config file (default: verdocs.toml, optional)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Debug logging; repeat to forward verbosity to the renderer
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colors in the terminal output
    #[arg(short = 'N', long, global = true)]
    pub no_colors: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments of the `build` subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Candidate doc source directories followed by the destination directory
    #[arg(value_name = "SOURCES... DEST", required = true, num_args = 2..)]
    pub paths: Vec<PathBuf>,

    /// Version published at the top level of the destination
    #[arg(short = 'r', long)]
    pub root_ref: Option<String>,

    /// Use the greatest semver tag as root ref (falls back to --root-ref)
    #[arg(short = 't', long)]
    pub greatest_tag: bool,

    /// Use the most recently committed tag as root ref (falls back to --root-ref)
    #[arg(short = 'T', long)]
    pub recent_tag: bool,

    /// Sort versions by one or more keys
    #[arg(short = 's', long, value_enum, action = ArgAction::Append)]
    pub sort: Vec<SortPolicy>,

    /// Invert the sort order
    #[arg(short = 'i', long)]
    pub invert: bool,

    /// List branches or tags first
    #[arg(short = 'p', long, value_enum)]
    pub priority: Option<Priority>,

    /// Only build these branches (literal names or regexes)
    #[arg(short = 'w', long, action = ArgAction::Append)]
    pub whitelist_branches: Vec<String>,

    /// Only build these tags (literal names or regexes)
    #[arg(short = 'W', long, action = ArgAction::Append)]
    pub whitelist_tags: Vec<String>,

    /// Show a warning banner on every version but the banner main ref
    #[arg(short = 'b', long)]
    pub show_banner: bool,

    /// Version the banner points to (default: the root ref)
    #[arg(short = 'B', long)]
    pub banner_main_ref: Option<String>,

    /// Point the banner to the greatest semver tag
    #[arg(short = 'a', long)]
    pub banner_greatest_tag: bool,

    /// Point the banner to the most recently committed tag
    #[arg(short = 'A', long)]
    pub banner_recent_tag: bool,

    /// Empty the destination directory before publishing
    #[arg(long)]
    pub clean: bool,

    /// Arguments passed through to the renderer verbatim
    #[arg(last = true)]
    pub overflow: Vec<String>,
}

impl BuildArgs {
    /// Candidate doc source directories (all positionals but the last).
    pub fn sources(&self) -> Vec<String> {
        self.paths
            .split_last()
            .map(|(_, sources)| {
                sources
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Destination directory (the last positional).
    pub fn destination(&self) -> Option<&Path> {
        self.paths.last().map(PathBuf::as_path)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build docs for every selected branch and tag into one site
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}
