//! The version set: every ref that will be published, in display order.
//!
//! Lifecycle within one run:
//!
//! 1. built from the ref inventory (base order: lexical by name)
//! 2. `filter` → `sort` → `prioritize`
//! 3. `resolve_root_ref`, then `resolve_banner_ref`
//! 4. `resolve_collisions` assigns provisional `root_dir`s for the pre-run
//! 5. pre-run builds; `mark_failed` + `prune_failed` drop broken versions
//! 6. `resolve_collisions` again, around the root version's top-level output
//! 7. final builds; a late failure is pruned the same way before a rebuild
//!
//! Past step 6 records are only removed, so every `root_dir` stays unique.

mod whitelist;

pub use whitelist::Whitelist;

use crate::config::{Priority, SortPolicy};
use crate::error::PipelineError;
use crate::log;
use crate::utils::{semver, slug};
use serde::Serialize;
use std::{
    cmp::{Ordering, Reverse},
    collections::BTreeSet,
};

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
}

/// One branch or tag that has docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Ref name without `refs/heads/` or `refs/tags/`
    pub name: String,
    pub kind: RefKind,
    /// Commit id the ref points at (peeled for annotated tags)
    pub sha: String,
    /// Commit timestamp, unix seconds
    pub date: i64,
    /// Output subdirectory, unique across the set
    pub root_dir: String,
    /// Doc source directory relative to the repository root (`.` for the root)
    pub doc_root: String,
    /// Entry document id, e.g. `index` or `contents`
    pub main_doc: String,
    /// Document ids the renderer produced
    pub found_docs: BTreeSet<String>,
    /// Renderer or export diagnostic once the build failed
    pub failure: Option<String>,
}

impl VersionRecord {
    pub fn new(name: impl Into<String>, kind: RefKind, sha: impl Into<String>, date: i64) -> Self {
        Self {
            name: name.into(),
            kind,
            sha: sha.into(),
            date,
            root_dir: String::new(),
            doc_root: ".".into(),
            main_doc: String::new(),
            found_docs: BTreeSet::new(),
            failure: None,
        }
    }

    /// Document to link to from page `pagename` of another version.
    pub fn link_target<'a>(&'a self, pagename: &'a str) -> Option<&'a str> {
        if self.found_docs.contains(pagename) {
            Some(pagename)
        } else {
            None
        }
    }
}

/// What templates get to see of each version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionView<'a> {
    pub name: &'a str,
    pub kind: RefKind,
    pub root_dir: &'a str,
    pub sha: &'a str,
    pub date: String,
}

// ============================================================================
// Version Set
// ============================================================================

#[derive(Debug, Default)]
pub struct VersionSet {
    records: Vec<VersionRecord>,
    root_ref: Option<String>,
    banner_main_ref: Option<String>,
}

impl VersionSet {
    /// Build a set in base order: lexical by name, branches before tags.
    pub fn new(mut records: Vec<VersionRecord>) -> Self {
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.kind.cmp(&b.kind)));
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionRecord> {
        self.records.iter()
    }

    /// Ref names in set order.
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    /// First record with this name in set order.
    pub fn get(&self, name: &str) -> Option<&VersionRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn root_ref(&self) -> Option<&str> {
        self.root_ref.as_deref()
    }

    pub fn root(&self) -> Option<&VersionRecord> {
        self.root_index().and_then(|index| self.records.get(index))
    }

    /// Position of the root record in set order.
    pub fn root_index(&self) -> Option<usize> {
        let name = self.root_ref.as_deref()?;
        self.records.iter().position(|r| r.name == name)
    }

    pub fn banner_main_ref(&self) -> Option<&str> {
        self.banner_main_ref.as_deref()
    }

    pub fn banner_main(&self) -> Option<&VersionRecord> {
        self.banner_main_ref.as_deref().and_then(|name| self.get(name))
    }

    pub fn disable_banner(&mut self) {
        self.banner_main_ref = None;
    }

    /// Serializable view of the whole set, in set order.
    pub fn views(&self) -> Vec<VersionView<'_>> {
        self.records
            .iter()
            .map(|r| VersionView {
                name: &r.name,
                kind: r.kind,
                root_dir: &r.root_dir,
                sha: &r.sha,
                date: chrono::DateTime::from_timestamp(r.date, 0)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Keep branches allowed by `branches` and tags allowed by `tags`.
    pub fn filter(&mut self, branches: &Whitelist, tags: &Whitelist) {
        self.records.retain(|r| match r.kind {
            RefKind::Branch => branches.allows(&r.name),
            RefKind::Tag => tags.allows(&r.name),
        });
    }

    /// Stable multi-key sort. Remaining ties fall back to the name, so the
    /// result does not depend on the order before the call.
    pub fn sort(&mut self, policies: &[SortPolicy], invert: bool) {
        self.records.sort_by(|a, b| {
            let ord = compare(a, b, policies);
            if invert { ord.reverse() } else { ord }
        });
    }

    /// Move branches (or tags) in front, keeping the order within each kind.
    pub fn prioritize(&mut self, priority: Option<Priority>) {
        let Some(priority) = priority else {
            return;
        };
        let first = match priority {
            Priority::Branches => RefKind::Branch,
            Priority::Tags => RefKind::Tag,
        };
        self.records.sort_by_key(|r| r.kind != first);
    }

    fn pick_tag(&self, greatest: bool, recent: bool) -> Option<&VersionRecord> {
        let mut tags = self.records.iter().filter(|r| r.kind == RefKind::Tag);
        if greatest {
            tags.min_by(|a, b| semver::compare_names(&a.name, &b.name))
        } else if recent {
            tags.min_by_key(|r| Reverse(r.date))
        } else {
            None
        }
    }

    /// Pick the version published at the top level.
    pub fn resolve_root_ref(
        &mut self,
        requested: &str,
        greatest_tag: bool,
        recent_tag: bool,
    ) -> Result<String, PipelineError> {
        if greatest_tag && recent_tag {
            return Err(PipelineError::AmbiguousRef { field: "root ref" });
        }

        let mut name = requested.to_owned();
        if greatest_tag || recent_tag {
            match self.pick_tag(greatest_tag, recent_tag) {
                Some(tag) => name = tag.name.clone(),
                None => log!(
                    "warn";
                    "No git tags with docs found in remote. Falling back to --root-ref value."
                ),
            }
        }

        if self.get(&name).is_none() {
            return Err(PipelineError::RootRefNotFound {
                name,
                known: self.names(),
            });
        }

        self.root_ref = Some(name.clone());
        Ok(name)
    }

    /// Pick the version the banner points to, `None` when it is not in the
    /// set (the banner is then disabled).
    ///
    /// Without an explicit ref the root ref is used.
    pub fn resolve_banner_ref(
        &mut self,
        requested: Option<&str>,
        greatest_tag: bool,
        recent_tag: bool,
    ) -> Result<Option<String>, PipelineError> {
        if greatest_tag && recent_tag {
            return Err(PipelineError::AmbiguousRef {
                field: "banner main ref",
            });
        }

        let fallback = requested.map(str::to_owned).or_else(|| self.root_ref.clone());
        let name = if greatest_tag || recent_tag {
            match self.pick_tag(greatest_tag, recent_tag) {
                Some(tag) => Some(tag.name.clone()),
                None => {
                    log!(
                        "warn";
                        "No git tags with docs found in remote. Falling back to --banner-main-ref value."
                    );
                    fallback
                }
            }
        } else {
            fallback
        };

        self.banner_main_ref = name.filter(|n| self.get(n).is_some());
        Ok(self.banner_main_ref.clone())
    }

    /// Assign every record a unique `root_dir`, first come first served in
    /// set order, avoiding the `taken` top-level entries of the destination.
    pub fn resolve_collisions(&mut self, taken: &[String]) {
        let slugs = slug::assign_unique(self.records.iter().map(|r| r.name.as_str()), taken);
        for (record, root_dir) in self.records.iter_mut().zip(slugs) {
            record.root_dir = root_dir;
        }
    }

    // ------------------------------------------------------------------------
    // Build results
    // ------------------------------------------------------------------------

    /// Record at `index` in set order.
    pub fn at(&self, index: usize) -> Option<&VersionRecord> {
        self.records.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut VersionRecord> {
        self.records.get_mut(index)
    }

    pub fn mark_failed(&mut self, index: usize, diagnostic: String) {
        if let Some(record) = self.records.get_mut(index) {
            record.failure = Some(diagnostic);
        }
    }

    /// Drop every failed record and return them.
    ///
    /// # Errors
    /// `RootRefBroken` if the root ref is among the failed records; nothing
    /// is removed in that case.
    pub fn prune_failed(&mut self) -> Result<Vec<VersionRecord>, PipelineError> {
        if let Some(root) = self.root()
            && let Some(diagnostic) = &root.failure
        {
            return Err(PipelineError::RootRefBroken {
                name: root.name.clone(),
                diagnostic: diagnostic.clone(),
            });
        }

        let (failed, kept) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.failure.is_some());
        self.records = kept;
        Ok(failed)
    }
}

/// Compare two records by the sort policies, then by name.
fn compare(a: &VersionRecord, b: &VersionRecord, policies: &[SortPolicy]) -> Ordering {
    policies
        .iter()
        .map(|policy| match policy {
            SortPolicy::Alpha => a.name.cmp(&b.name),
            SortPolicy::Semver => semver::compare_names(&a.name, &b.name),
            SortPolicy::Time => b.date.cmp(&a.date),
        })
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.name.cmp(&b.name))
}

// ============================================================================
// Tests
// ============================================================================
