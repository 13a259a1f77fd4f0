//! Versioned site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── select_versions()
//!     │       │
//!     │       └── gather refs → whitelist → sort → root/banner ref → slugs
//!     │
//!     ├── pre_build()
//!     │       │
//!     │       └── root first, then the rest: export → main doc → render
//!     │           into <workspace>/prerun; drop failures, then final slugs
//!     │           around the root's top-level output
//!     │
//!     ├── build_all()
//!     │       │
//!     │       └── render every survivor into <workspace>/staging/<root_dir>
//!     │           with the final set; a late failure drops it and rebuilds
//!     │
//!     └── postprocess::publish() ──► copy to destination, rewrite pages
//! ```
//!
//! Nothing is written to the destination until every version was built.

use crate::{
    config::{BuildConfig, SiteConfig},
    debug,
    error::PipelineError,
    export::Exporter,
    inventory::gather_refs,
    log, logger, postprocess,
    renderer::{RenderConfig, RenderOutput, Renderer},
    vcs::{Vcs, repo_path},
    versions::{VersionRecord, VersionSet},
};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Outcome of one version's build.
#[derive(Debug)]
pub enum BuildResult {
    Built(RenderOutput),
    Failed(String),
}

/// Build every selected version and publish the combined site.
///
/// Returns the published version set.
pub fn build_site(
    config: &SiteConfig,
    vcs: &dyn Vcs,
    renderer: &dyn Renderer,
) -> Result<VersionSet> {
    let destination = config.destination()?;
    let mut versions = select_versions(config, vcs)?;

    let workspace = tempfile::Builder::new()
        .prefix("verdocs-")
        .tempdir()
        .context("Failed to create the build workspace")?;
    let mut exporter = Exporter::new(vcs, &workspace.path().join("exports"));
    let staging = workspace.path().join("staging");

    pre_build(config, vcs, renderer, &mut exporter, &mut versions, workspace.path())?;
    check_banner_survived(config, &mut versions);

    build_all(config, renderer, &mut exporter, &mut versions, &staging)?;
    check_banner_survived(config, &mut versions);

    if config.build.clean && destination.exists() {
        log!("publish"; "cleaning {}", destination.display());
        fs::remove_dir_all(destination)
            .with_context(|| format!("Failed to clear {}", destination.display()))?;
    }
    postprocess::publish(config, &versions, &staging, destination)?;

    log!("build"; "done");
    Ok(versions)
}

/// Everything that happens before the first export: order, root ref and
/// banner ref are final when this returns, slugs are provisional.
pub fn select_versions(config: &SiteConfig, vcs: &dyn Vcs) -> Result<VersionSet> {
    let records = gather_refs(vcs, &config.build.sources, &config.build.conf_file)?;
    let mut versions = VersionSet::new(records);

    let (branches, tags) = config.versions.whitelists()?;
    versions.filter(&branches, &tags);
    if versions.is_empty() {
        return Err(PipelineError::NothingWhitelisted.into());
    }
    // Base order is lexical, so this lists names alphabetically.
    log!("refs"; "Passed whitelisting: {}", versions.names().join(" "));

    versions.sort(&config.versions.sort, config.versions.invert);
    versions.prioritize(config.versions.priority);

    let root_ref = versions.resolve_root_ref(
        &config.versions.root_ref,
        config.versions.greatest_tag,
        config.versions.recent_tag,
    )?;
    log!("refs"; "Root ref is: {root_ref}");

    if config.banner.show {
        let requested = config.banner.main_ref.as_deref();
        let banner_ref = versions.resolve_banner_ref(
            requested,
            config.banner.greatest_tag,
            config.banner.recent_tag,
        )?;
        match banner_ref {
            Some(name) => log!("refs"; "Banner main ref is: {name}"),
            None => log!(
                "warn";
                "Banner main ref {} not found. Disabling banner.",
                requested.unwrap_or(&root_ref)
            ),
        }
    }

    versions.resolve_collisions(&[]);
    debug!("refs"; "build order: {}", versions.names().join(" "));
    Ok(versions)
}

/// Dry run of every version, root first, into `<workspace>/prerun`.
///
/// Versions failing to export or render are dropped before any final
/// render, then every `root_dir` is assigned around the entries the root
/// version writes at the top of the destination.
fn pre_build(
    config: &SiteConfig,
    vcs: &dyn Vcs,
    renderer: &dyn Renderer,
    exporter: &mut Exporter<'_>,
    versions: &mut VersionSet,
    workspace: &Path,
) -> Result<()> {
    let prerun = workspace.join("prerun");
    let root_index = versions.root_index().ok_or_else(|| anyhow!("Root ref is not set"))?;
    let total = versions.len();
    let order = std::iter::once(root_index).chain((0..total).filter(|&index| index != root_index));

    let mut root_entries = Vec::new();
    for (step, index) in order.enumerate() {
        let result = match export_version(config, vcs, exporter, versions, index) {
            Ok(source) => {
                let Some(record) = versions.at(index) else { break };
                log!("pre-run"; "[{}/{total}] {} ({})", step + 1, record.name, record.sha);
                render_version(config, versions, record, renderer, &source, &prerun)
            }
            Err(e) => BuildResult::Failed(format!("{e:#}")),
        };

        match result {
            BuildResult::Built(output) if index == root_index => {
                root_entries = top_level_entries(&output.output_dir)?;
            }
            BuildResult::Built(_) => {}
            BuildResult::Failed(diagnostic) => {
                record_failure(versions, index, index == root_index, diagnostic)?;
            }
        }
    }

    drop_failed(versions)?;
    versions.resolve_collisions(&root_entries);
    debug!(
        "refs";
        "root dirs: {}",
        versions.iter().map(|r| r.root_dir.as_str()).collect::<Vec<_>>().join(" ")
    );
    Ok(())
}

/// Render every version into `staging/<root_dir>` with the final set.
///
/// A version failing here although its pre-run passed is dropped and
/// everything is rendered again, so every version's context lists exactly
/// the published versions.
fn build_all(
    config: &SiteConfig,
    renderer: &dyn Renderer,
    exporter: &mut Exporter<'_>,
    versions: &mut VersionSet,
    staging: &Path,
) -> Result<()> {
    loop {
        if staging.exists() {
            fs::remove_dir_all(staging)
                .with_context(|| format!("Failed to clear {}", staging.display()))?;
        }
        let root_index = versions.root_index().ok_or_else(|| anyhow!("Root ref is not set"))?;
        let total = versions.len();

        let mut found = Vec::with_capacity(total);
        let mut failed = false;
        for index in 0..total {
            let Some(record) = versions.at(index) else { break };
            log!("build"; "[{}/{total}] {} ({})", index + 1, record.name, record.sha);

            let result = match exporter.export(record) {
                Ok(tree) => {
                    let source = tree.join(&record.doc_root);
                    render_version(config, versions, record, renderer, &source, staging)
                }
                Err(e) => BuildResult::Failed(format!("{e:#}")),
            };
            match result {
                BuildResult::Built(output) => found.push((index, output.found_docs)),
                BuildResult::Failed(diagnostic) => {
                    record_failure(versions, index, index == root_index, diagnostic)?;
                    failed = true;
                }
            }
        }

        if failed {
            drop_failed(versions)?;
            log!("build"; "Rebuilding everything.");
            continue;
        }
        for (index, found_docs) in found {
            if let Some(record) = versions.at_mut(index) {
                record.found_docs = found_docs;
            }
        }
        return Ok(());
    }
}

/// Export the version's commit and read its main document.
fn export_version(
    config: &SiteConfig,
    vcs: &dyn Vcs,
    exporter: &mut Exporter<'_>,
    versions: &mut VersionSet,
    index: usize,
) -> Result<PathBuf> {
    let record = versions
        .at_mut(index)
        .ok_or_else(|| anyhow!("No version at position {index}"))?;
    let tree = exporter.export(record)?;
    record.main_doc = read_main_doc(vcs, record, &config.build);
    Ok(tree.join(&record.doc_root))
}

fn render_version(
    config: &SiteConfig,
    versions: &VersionSet,
    record: &VersionRecord,
    renderer: &dyn Renderer,
    source: &Path,
    output_root: &Path,
) -> BuildResult {
    let render = || -> Result<RenderOutput> {
        let render_config =
            RenderConfig::for_version(config, versions, record, logger::verbosity())?;
        renderer.render(source, &output_root.join(&record.root_dir), &render_config)
    };
    match render() {
        Ok(output) => {
            debug!(
                "build";
                "{}: {} pages in {}",
                record.name,
                output.found_docs.len(),
                output.output_dir.display()
            );
            BuildResult::Built(output)
        }
        Err(e) => BuildResult::Failed(format!("{e:#}")),
    }
}

/// Root failures abort the run; any other failure marks the version.
fn record_failure(
    versions: &mut VersionSet,
    index: usize,
    is_root: bool,
    diagnostic: String,
) -> Result<()> {
    let name = versions.at(index).map(|r| r.name.clone()).unwrap_or_default();
    if is_root {
        return Err(PipelineError::RootRefBroken { name, diagnostic }.into());
    }
    log!("warn"; "Building {name} failed, skipping it: {diagnostic}");
    versions.mark_failed(index, diagnostic);
    Ok(())
}

fn drop_failed(versions: &mut VersionSet) -> Result<()> {
    let pruned = versions.prune_failed()?;
    if !pruned.is_empty() {
        let names: Vec<&str> = pruned.iter().map(|r| r.name.as_str()).collect();
        log!("warn"; "Dropped failed versions: {}", names.join(" "));
    }
    Ok(())
}

/// Names at the top of a rendered tree, which the root copy publishes next
/// to the version directories.
fn top_level_entries(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Disable the banner run-wide when its main ref was dropped.
fn check_banner_survived(config: &SiteConfig, versions: &mut VersionSet) {
    if !config.banner.show {
        return;
    }
    if let Some(name) = versions.banner_main_ref().map(str::to_owned)
        && versions.banner_main().is_none()
    {
        log!("warn"; "Banner main ref {name} failed during pre-run. Disabling banner.");
        versions.disable_banner();
    }
}

/// Entry document named by the conf file, or the configured default.
fn read_main_doc(vcs: &dyn Vcs, record: &VersionRecord, build: &BuildConfig) -> String {
    let conf_path = repo_path(&record.doc_root, &build.conf_file);
    match vcs.read_file(&record.sha, &conf_path) {
        Ok(conf) => parse_main_doc(&conf).unwrap_or_else(|| build.main_doc.clone()),
        Err(e) => {
            debug!("build"; "{}: {e:#}", record.name);
            build.main_doc.clone()
        }
    }
}

/// `root_doc = "contents"` (or the older `master_doc`) in a Sphinx conf file.
fn parse_main_doc(conf: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*(?:root_doc|master_doc)\s*=\s*['"]([^'"]+)['"]"#).unwrap()
    });
    re.captures(conf).map(|caps| caps[1].to_owned())
}
