//! `[banner]` section configuration.

use serde::{Deserialize, Serialize};

/// `[banner]` section in verdocs.toml - the "you are reading an old version"
/// warning shown on every version except the banner main ref.
///
/// # Example
/// ```toml
/// [banner]
/// show = true
/// recent_tag = true
/// project = "MyProject"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BannerConfig {
    pub show: bool,

    /// Version the banner points readers to. Falls back to the root ref.
    pub main_ref: Option<String>,

    /// Point to the greatest semver tag instead.
    pub greatest_tag: bool,

    /// Point to the most recently committed tag instead.
    pub recent_tag: bool,

    /// Project name used in the banner text. Falls back to the name of the
    /// repository directory.
    pub project: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_defaults() {
        let config = BannerConfig::default();
        assert!(!config.show);
        assert!(config.main_ref.is_none());
        assert!(config.project.is_none());
    }

    #[test]
    fn test_banner_from_toml() {
        let config: BannerConfig = toml::from_str(
            r#"
            show = true
            main_ref = "stable"
            project = "MyProject"
            "#,
        )
        .unwrap();
        assert!(config.show);
        assert_eq!(config.main_ref.as_deref(), Some("stable"));
        assert_eq!(config.project.as_deref(), Some("MyProject"));
    }
}
