//! `[build]` section configuration.
//!
//! Where the docs live in each ref, how to render them and where the
//! combined site goes.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// What a version's navigation entry points at when the current page does
/// not exist in that version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPage {
    /// Link to that version's main document (default).
    #[default]
    MainDoc,
    /// Leave that version out of the page's navigation.
    Omit,
}

// ============================================================================
// Main BuildConfig
// ============================================================================

/// `[build]` section in verdocs.toml.
///
/// # Example
/// ```toml
/// [build]
/// sources = ["docs"]
/// destination = "public"
/// command = ["sphinx-build", "-b", "html", "-j", "auto"]
/// missing_page = "omit"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Git repository to read refs from (usually set via CLI `--git-root`).
    pub git_root: Option<PathBuf>,

    /// Candidate doc source directories, relative to the repository root.
    /// The first one holding the conf file wins, per ref.
    #[serde(default = "defaults::build::sources")]
    #[educe(Default = defaults::build::sources())]
    pub sources: Vec<String>,

    /// Output directory for the combined site.
    pub destination: Option<PathBuf>,

    /// Renderer conf file name marking a doc root.
    #[serde(default = "defaults::build::conf_file")]
    #[educe(Default = defaults::build::conf_file())]
    pub conf_file: String,

    /// Entry document id, used when the conf file does not name one.
    #[serde(default = "defaults::build::main_doc")]
    #[educe(Default = defaults::build::main_doc())]
    pub main_doc: String,

    /// Renderer command and leading arguments.
    #[serde(default = "defaults::build::command")]
    #[educe(Default = defaults::build::command())]
    pub command: Vec<String>,

    /// Extra template search paths handed to every build.
    pub templates: Vec<PathBuf>,

    /// Remote whose branches and tags are built.
    #[serde(default = "defaults::build::remote")]
    #[educe(Default = defaults::build::remote())]
    pub remote: String,

    /// Empty the destination before publishing.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    #[serde(default = "defaults::build::missing_page")]
    #[educe(Default = defaults::build::missing_page())]
    pub missing_page: MissingPage,

    /// `id` of the element the version list is injected into.
    #[serde(default = "defaults::build::nav_id")]
    #[educe(Default = defaults::build::nav_id())]
    pub nav_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.sources, vec!["docs", "."]);
        assert_eq!(config.conf_file, "conf.py");
        assert_eq!(config.main_doc, "index");
        assert_eq!(config.command, vec!["sphinx-build", "-b", "html"]);
        assert_eq!(config.remote, "origin");
        assert_eq!(config.missing_page, MissingPage::MainDoc);
        assert_eq!(config.nav_id, "versions");
        assert!(config.destination.is_none());
        assert!(!config.clean);
    }

    #[test]
    fn test_build_from_toml() {
        let config: BuildConfig = toml::from_str(
            r#"
            sources = ["doc"]
            destination = "public"
            missing_page = "omit"
            templates = ["_templates"]
            "#,
        )
        .unwrap();
        assert_eq!(config.sources, vec!["doc"]);
        assert_eq!(config.destination, Some(PathBuf::from("public")));
        assert_eq!(config.missing_page, MissingPage::Omit);
        assert_eq!(config.templates, vec![PathBuf::from("_templates")]);
        assert_eq!(config.conf_file, "conf.py");
    }

    #[test]
    fn test_build_unknown_field_rejected() {
        assert!(toml::from_str::<BuildConfig>("minify = true").is_err());
    }
}
