//! The documentation renderer, invoked once per version.
//!
//! Each invocation gets its own [`RenderConfig`] value, built from scratch,
//! and its own process. Nothing carries over from one version to the next.

use crate::config::SiteConfig;
use crate::utils::exec::{FilterRule, exec, internal::to_cmd_vec};
use crate::versions::{VersionRecord, VersionSet};
use anyhow::{Context, Result};
use std::{
    collections::BTreeSet,
    ffi::OsString,
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Sphinx progress chatter that goes to stderr on some setups.
const RENDER_FILTER: FilterRule =
    FilterRule::new(&["Running Sphinx", "loading pickled environment"]);

/// What one renderer invocation is told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Renderer settings (`-D key=value`)
    pub settings: Vec<(String, String)>,
    /// Template context (`-A key=value`)
    pub context: Vec<(String, String)>,
    /// Extra `-v` flags
    pub verbosity: u8,
    /// Pass-through arguments, placed before the context
    pub overflow: Vec<String>,
}

impl RenderConfig {
    /// Configuration for rendering `record`: base settings, the overflow
    /// arguments, then the version context.
    pub fn for_version(
        config: &SiteConfig,
        versions: &VersionSet,
        record: &VersionRecord,
        verbosity: u8,
    ) -> Result<Self> {
        let mut settings = vec![("root_doc".to_owned(), record.main_doc.clone())];
        if !config.build.templates.is_empty() {
            let paths: Vec<String> = config
                .build
                .templates
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            settings.push(("templates_path".to_owned(), paths.join(",")));
        }

        let is_root = versions.root_ref() == Some(record.name.as_str());
        let versions_json =
            serde_json::to_string(&versions.views()).context("Failed to serialize versions")?;
        let context = vec![
            ("current_version".to_owned(), record.name.clone()),
            ("scv_is_root".to_owned(), if is_root { "1" } else { "" }.to_owned()),
            ("versions".to_owned(), versions_json),
            ("github_version".to_owned(), record.name.clone()),
            ("bitbucket_version".to_owned(), record.name.clone()),
        ];

        Ok(Self {
            settings,
            context,
            verbosity: verbosity.saturating_sub(1),
            overflow: config.overflow.clone(),
        })
    }

    /// Renderer argv after the command: settings, overflow, context,
    /// verbosity, then the two positionals.
    ///
    /// Context follows the overflow so version context always wins.
    pub fn to_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Vec::new();
        for (key, value) in &self.settings {
            args.push("-D".into());
            args.push(format!("{key}={value}").into());
        }
        args.extend(self.overflow.iter().map(OsString::from));
        for (key, value) in &self.context {
            args.push("-A".into());
            args.push(format!("{key}={value}").into());
        }
        args.extend((0..self.verbosity).map(|_| OsString::from("-v")));
        args.push(source.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub output_dir: PathBuf,
    /// Document ids of every rendered page
    pub found_docs: BTreeSet<String>,
}

pub trait Renderer {
    /// Render the doc source `source` into `output`.
    fn render(&self, source: &Path, output: &Path, config: &RenderConfig) -> Result<RenderOutput>;
}

/// External renderer command, `sphinx-build -b html` by default.
///
/// Argv: `command... settings... overflow... context... source output`
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: Vec<String>,
}

impl CommandRenderer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, source: &Path, output: &Path, config: &RenderConfig) -> Result<RenderOutput> {
        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;

        let args = config.to_args(source, output);
        exec(source, &to_cmd_vec(&self.command), &args, &RENDER_FILTER)?;

        Ok(RenderOutput {
            output_dir: output.to_path_buf(),
            found_docs: collect_found_docs(output),
        })
    }
}

/// Document ids of every `.html` page under `dir`, skipping `_`-prefixed
/// asset directories.
pub fn collect_found_docs(dir: &Path) -> BTreeSet<String> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(dir).ok()?;
            let parent = rel.parent()?;
            let in_asset_dir = parent.components().any(|c| match c {
                Component::Normal(name) => name.to_string_lossy().starts_with('_'),
                _ => false,
            });
            if in_asset_dir {
                return None;
            }
            doc_id(rel)
        })
        .collect()
}

/// `sub/page.html` → `sub/page`
pub fn doc_id(rel: &Path) -> Option<String> {
    if rel.extension()? != "html" {
        return None;
    }
    let parts: Vec<String> = rel
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
