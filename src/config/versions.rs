//! `[versions]` section configuration.
//!
//! Which refs become versions, in what order, and which one is the root.

use super::{defaults, error::ConfigError};
use crate::versions::Whitelist;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Sort key for the version list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Ref name, ascending.
    Alpha,
    /// Greatest version number first.
    Semver,
    /// Most recent commit first.
    Time,
}

/// Which kind of ref is listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Branches,
    Tags,
}

/// `[versions]` section in verdocs.toml.
///
/// # Example
/// ```toml
/// [versions]
/// root_ref = "main"
/// sort = ["semver", "time"]
/// priority = "branches"
/// whitelist_tags = ['^v\d+\.\d+$']
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct VersionsConfig {
    /// Ref published at the top level of the destination.
    #[serde(default = "defaults::versions::root_ref")]
    #[educe(Default = defaults::versions::root_ref())]
    pub root_ref: String,

    /// Use the greatest semver tag as root instead.
    pub greatest_tag: bool,

    /// Use the most recently committed tag as root instead.
    pub recent_tag: bool,

    pub sort: Vec<SortPolicy>,

    pub invert: bool,

    pub priority: Option<Priority>,

    /// Literal branch names or regex patterns; empty keeps every branch.
    pub whitelist_branches: Vec<String>,

    /// Literal tag names or regex patterns; empty keeps every tag.
    pub whitelist_tags: Vec<String>,
}

impl VersionsConfig {
    /// Compile both whitelists.
    pub fn whitelists(&self) -> Result<(Whitelist, Whitelist), ConfigError> {
        let branches = Whitelist::new(&self.whitelist_branches).map_err(|(pattern, source)| {
            ConfigError::Pattern {
                field: "[versions.whitelist_branches]",
                pattern,
                source,
            }
        })?;
        let tags = Whitelist::new(&self.whitelist_tags).map_err(|(pattern, source)| {
            ConfigError::Pattern {
                field: "[versions.whitelist_tags]",
                pattern,
                source,
            }
        })?;
        Ok((branches, tags))
    }
}
