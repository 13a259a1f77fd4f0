//! Run configuration from `verdocs.toml` and the command line.
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[build]`     | Doc roots, renderer command, destination         |
//! | `[versions]`  | Root ref, sort order, whitelists                 |
//! | `[banner]`    | Old/development version warning banner           |
//! | `overflow`    | Arguments passed through to the renderer         |
//!
//! # Example
//!
//! ```toml
//! overflow = ["-D", "language=en"]
//!
//! [build]
//! sources = ["docs"]
//! destination = "public"
//!
//! [versions]
//! sort = ["semver"]
//! whitelist_tags = ['^v\d+']
//!
//! [banner]
//! show = true
//! recent_tag = true
//! ```
//!
//! The file is optional: every field has a default and the command line
//! overrides whatever the file says. After loading, the config is frozen into
//! a `&'static SiteConfig` snapshot for the rest of the run.

mod banner;
mod build;
pub mod defaults;
mod error;
mod versions;

pub use banner::BannerConfig;
pub use build::{BuildConfig, MissingPage};
pub use error::ConfigError;
pub use versions::{Priority, SortPolicy, VersionsConfig};

use crate::cli::{BuildArgs, Cli, Commands};
use crate::error::PipelineError;
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up in the working directory when `-C` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "verdocs.toml";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing verdocs.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub versions: VersionsConfig,

    #[serde(default)]
    pub banner: BannerConfig,

    /// Renderer arguments passed through verbatim, after everything else
    #[serde(default)]
    pub overflow: Vec<String>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content).with_context(|| format!("Failed to parse `{}`", path.display()))
    }

    /// Directory the git repository is discovered from
    pub fn get_root(&self) -> &Path {
        self.build.git_root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Destination directory, checked by `validate`
    pub fn destination(&self) -> Result<&Path> {
        self.build
            .destination
            .as_deref()
            .ok_or_else(|| ConfigError::Validation("[build.destination] is not set".into()).into())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        if cli.git_root.is_some() {
            self.build.git_root = cli.git_root.clone();
        }

        match &cli.command {
            Commands::Build { build_args } => self.update_with_build_args(build_args),
        }

        self.normalize_paths();
    }

    fn update_with_build_args(&mut self, args: &BuildArgs) {
        let sources = args.sources();
        if !sources.is_empty() {
            self.build.sources = sources;
        }
        if let Some(destination) = args.destination() {
            self.build.destination = Some(destination.to_path_buf());
        }
        self.build.clean |= args.clean;

        let versions = &mut self.versions;
        Self::update_option(&mut versions.root_ref, args.root_ref.as_ref());
        versions.greatest_tag |= args.greatest_tag;
        versions.recent_tag |= args.recent_tag;
        versions.invert |= args.invert;
        if args.priority.is_some() {
            versions.priority = args.priority;
        }
        Self::update_list(&mut versions.sort, &args.sort);
        Self::update_list(&mut versions.whitelist_branches, &args.whitelist_branches);
        Self::update_list(&mut versions.whitelist_tags, &args.whitelist_tags);

        let banner = &mut self.banner;
        banner.show |= args.show_banner;
        if args.banner_main_ref.is_some() {
            banner.main_ref = args.banner_main_ref.clone();
        }
        banner.greatest_tag |= args.banner_greatest_tag;
        banner.recent_tag |= args.banner_recent_tag;

        Self::update_list(&mut self.overflow, &args.overflow);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Replace a config list if the CLI gave any values
    fn update_list<T: Clone>(config_list: &mut Vec<T>, cli_list: &[T]) {
        if !cli_list.is_empty() {
            *config_list = cli_list.to_vec();
        }
    }

    /// Make all filesystem paths absolute (with `~` expansion)
    fn normalize_paths(&mut self) {
        if let Some(git_root) = &self.build.git_root {
            self.build.git_root = Some(Self::normalize_path(git_root));
        }
        if let Some(destination) = &self.build.destination {
            self.build.destination = Some(Self::normalize_path(destination));
        }
        self.build.templates = self
            .build
            .templates
            .iter()
            .map(|p| Self::normalize_path(p))
            .collect();
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        expanded.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if expanded.is_absolute() {
                expanded.clone()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(&expanded))
                    .unwrap_or_else(|_| expanded.clone())
            }
        })
    }

    /// Validate configuration before any git or renderer call
    pub fn validate(&self) -> Result<()> {
        if self.build.sources.is_empty() {
            bail!(ConfigError::Validation(
                "[build.sources] must have at least one element".into()
            ));
        }

        if self.build.nav_id.trim().is_empty() {
            bail!(ConfigError::Validation("[build.nav_id] must not be empty".into()));
        }

        Self::check_command_installed("[build.command]", &self.build.command)?;

        if self.versions.greatest_tag && self.versions.recent_tag {
            bail!(PipelineError::AmbiguousRef { field: "root ref" });
        }
        if self.banner.greatest_tag && self.banner.recent_tag {
            bail!(PipelineError::AmbiguousRef {
                field: "banner main ref"
            });
        }

        self.versions.whitelists()?;
        self.check_destination()
    }

    /// Refuse destinations that would overwrite the repository itself
    fn check_destination(&self) -> Result<()> {
        let destination = self.destination()?;
        let repo_root = Self::normalize_path(self.get_root());
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;

        if repo_root.starts_with(destination) {
            bail!(ConfigError::Validation(format!(
                "[build.destination] `{}` contains the git repository",
                destination.display()
            )));
        }
        if self.build.clean && cwd.starts_with(destination) {
            bail!(ConfigError::Validation(format!(
                "[build.clean] would delete the working directory `{}`",
                cwd.display()
            )));
        }
        Ok(())
    }

    /// Check if a command is installed and available
    fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        let Some(cmd) = command.first() else {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        };

        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found. Please install it first."))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
