//! Publishing: staging trees → destination, then cross-version page rewrite.
//!
//! # Layout
//!
//! ```text
//! <destination>/
//!     index.html ...        root version (root copy)
//!     <root_dir>/index.html one tree per built version
//! ```
//!
//! Every page gets the navigation list (one `<li>` per version, set order)
//! and, unless it belongs to the banner-main version, the banner.

use crate::{
    config::{MissingPage, SiteConfig},
    debug, log,
    logger::ProgressBars,
    utils::xml::{
        Banner, NavItem, PageInjection, inject_page,
        link::{self_href, tree_href, version_href},
    },
    versions::{RefKind, VersionRecord, VersionSet},
};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use walkdir::WalkDir;

/// Banner stylesheet, written to `_static/banner.css` of trees showing a banner.
const BANNER_CSS: &str = include_str!("embed/css/banner.css");

const BANNER_CSS_PATH: &str = "_static/banner.css";

/// A published tree being rewritten.
struct Tree<'a> {
    record: &'a VersionRecord,
    dir: PathBuf,
    is_root_copy: bool,
}

/// Rewrite inputs shared by every page of the run.
struct RewriteContext<'a> {
    versions: &'a VersionSet,
    nav_id: &'a str,
    missing_page: MissingPage,
    /// `Some` when the banner is enabled run-wide
    banner_main: Option<&'a VersionRecord>,
    project: &'a str,
}

/// Copy every built version from `staging/<root_dir>` into the destination,
/// add the root copy, then rewrite all pages.
pub fn publish(
    config: &SiteConfig,
    versions: &VersionSet,
    staging: &Path,
    destination: &Path,
) -> Result<()> {
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    let root = versions.root().ok_or_else(|| anyhow!("Root ref is not set"))?;

    let mut trees = Vec::with_capacity(versions.len() + 1);
    for record in versions.iter() {
        let dir = destination.join(&record.root_dir);
        copy_tree(&staging.join(&record.root_dir), &dir)?;
        trees.push(Tree { record, dir, is_root_copy: false });
    }
    copy_tree(&staging.join(&root.root_dir), destination)?;
    trees.push(Tree {
        record: root,
        dir: destination.to_path_buf(),
        is_root_copy: true,
    });

    let ctx = RewriteContext {
        versions,
        nav_id: &config.build.nav_id,
        missing_page: config.build.missing_page,
        banner_main: if config.banner.show { versions.banner_main() } else { None },
        project: config.banner.project.as_deref().unwrap_or_default(),
    };

    for tree in &trees {
        rewrite_tree(tree, &ctx)?;
    }

    log!("publish"; "{} versions -> {}", versions.len(), destination.display());
    Ok(())
}

/// Rewrite every page of one tree in parallel.
fn rewrite_tree(tree: &Tree<'_>, ctx: &RewriteContext<'_>) -> Result<()> {
    let shows_banner = ctx
        .banner_main
        .is_some_and(|main| main.root_dir != tree.record.root_dir);
    if shows_banner {
        let css = tree.dir.join(BANNER_CSS_PATH);
        if let Some(parent) = css.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&css, BANNER_CSS).with_context(|| format!("Failed to write {}", css.display()))?;
    }

    let pages: Vec<&str> = tree.record.found_docs.iter().map(String::as_str).collect();
    let progress = ProgressBars::new_filtered(&[("rewrite", pages.len())]);
    let has_error = AtomicBool::new(false);
    let unparsed = AtomicUsize::new(0);

    pages.par_iter().try_for_each(|pagename| {
        if has_error.load(Ordering::Relaxed) {
            return Err(anyhow!("Aborted"));
        }
        let path = tree.dir.join(format!("{pagename}.html"));
        let result = rewrite_page(&path, pagename, tree, ctx, shows_banner);
        if let Some(progress) = &progress {
            progress.inc_by_name("rewrite");
        }
        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                unparsed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                if !has_error.swap(true, Ordering::Relaxed) {
                    log!("error"; "{}: {:#}", path.display(), e);
                }
                Err(anyhow!("Rewriting {} failed", tree.record.name))
            }
        }
    })?;

    if let Some(progress) = &progress {
        progress.finish();
    }
    let unparsed = unparsed.into_inner();
    if unparsed > 0 {
        log!(
            "warn";
            "{}: {unparsed} pages could not be parsed and were left unchanged",
            tree.record.name
        );
    }
    Ok(())
}

/// Rewrite one page in place. `Ok(false)` when it could not be parsed.
fn rewrite_page(
    path: &Path,
    pagename: &str,
    tree: &Tree<'_>,
    ctx: &RewriteContext<'_>,
    shows_banner: bool,
) -> Result<bool> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let nav = nav_items(pagename, tree, ctx);
    let banner = if shows_banner {
        ctx.banner_main.map(|main| make_banner(pagename, tree, main, ctx))
    } else {
        None
    };
    let stylesheet = shows_banner.then(|| tree_href(pagename, BANNER_CSS_PATH));

    let page = PageInjection {
        nav_id: ctx.nav_id,
        nav: &nav,
        banner: banner.as_ref(),
        stylesheet: stylesheet.as_deref(),
    };
    match inject_page(&content, &page) {
        Ok(html) => {
            fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(true)
        }
        Err(e) => {
            debug!("rewrite"; "{}: {e}", path.display());
            Ok(false)
        }
    }
}

/// Document of `target` to link to from `pagename`, or `None` to omit it.
fn link_doc<'a>(
    target: &'a VersionRecord,
    pagename: &'a str,
    missing_page: MissingPage,
) -> Option<&'a str> {
    target.link_target(pagename).or(match missing_page {
        MissingPage::MainDoc => Some(target.main_doc.as_str()),
        MissingPage::Omit => None,
    })
}

/// One `<li>` per version in set order.
fn nav_items(pagename: &str, tree: &Tree<'_>, ctx: &RewriteContext<'_>) -> Vec<NavItem> {
    ctx.versions
        .iter()
        .filter_map(|target| {
            let current = target.root_dir == tree.record.root_dir;
            let doc = link_doc(target, pagename, ctx.missing_page)?;
            let href = if current && !tree.is_root_copy && doc == pagename {
                self_href(pagename)
            } else {
                version_href(pagename, tree.is_root_copy, &target.root_dir, doc)
            };
            Some(NavItem {
                name: target.name.clone(),
                href,
                current,
            })
        })
        .collect()
}

fn make_banner(
    pagename: &str,
    tree: &Tree<'_>,
    main: &VersionRecord,
    ctx: &RewriteContext<'_>,
) -> Banner {
    let doc = main.link_target(pagename).unwrap_or(&main.main_doc);
    let kind = if is_development(tree.record, main) {
        "the development version"
    } else {
        "an old version"
    };
    Banner {
        message: format!("{kind} of {}", ctx.project),
        main_name: main.name.clone(),
        main_href: version_href(pagename, tree.is_root_copy, &main.root_dir, doc),
    }
}

/// Newer than the banner-main commit; on equal dates branches count as
/// development and tags as old.
fn is_development(current: &VersionRecord, main: &VersionRecord) -> bool {
    match current.date.cmp(&main.date) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => current.kind == RefKind::Branch,
    }
}

/// Recursively copy `src` into `dst`, merging with existing content.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
