//! Per-commit source trees.

use crate::debug;
use crate::vcs::Vcs;
use crate::versions::VersionRecord;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Materializes commits under `<workspace>/<sha>`, once per commit.
///
/// Versions sharing a commit share the tree. Trees are read-only inputs to
/// the renderer and live as long as the workspace.
pub struct Exporter<'a> {
    vcs: &'a dyn Vcs,
    workspace: PathBuf,
    trees: FxHashMap<String, PathBuf>,
}

impl<'a> Exporter<'a> {
    pub fn new(vcs: &'a dyn Vcs, workspace: &Path) -> Self {
        Self {
            vcs,
            workspace: workspace.to_path_buf(),
            trees: FxHashMap::default(),
        }
    }

    /// Export the record's commit and return the tree root.
    pub fn export(&mut self, record: &VersionRecord) -> Result<PathBuf> {
        if let Some(tree) = self.trees.get(&record.sha) {
            debug!("export"; "{} reuses the tree of {}", record.name, record.sha);
            return Ok(tree.clone());
        }

        let tree = self.workspace.join(&record.sha);
        if tree.exists() {
            fs::remove_dir_all(&tree)
                .with_context(|| format!("Failed to clear {}", tree.display()))?;
        }
        fs::create_dir_all(&tree).with_context(|| format!("Failed to create {}", tree.display()))?;

        if let Err(err) = self.vcs.export(&record.sha, &tree) {
            fs::remove_dir_all(&tree).ok();
            return Err(err.context(format!("Failed to export {} ({})", record.name, record.sha)));
        }

        debug!("export"; "{} -> {}", record.name, tree.display());
        self.trees.insert(record.sha.clone(), tree.clone());
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::tests::FakeVcs;
    use crate::versions::RefKind;

    #[test]
    fn test_export_writes_tree_keyed_by_sha() {
        let vcs = FakeVcs::default().with_commit("a1", 1, &[("docs/conf.py", "x = 1")]);
        let workspace = tempfile::tempdir().unwrap();
        let mut exporter = Exporter::new(&vcs, workspace.path());

        let record = VersionRecord::new("main", RefKind::Branch, "a1", 1);
        let tree = exporter.export(&record).unwrap();
        assert_eq!(tree, workspace.path().join("a1"));
        assert_eq!(fs::read_to_string(tree.join("docs/conf.py")).unwrap(), "x = 1");
    }

    #[test]
    fn test_export_is_shared_per_commit() {
        let vcs = FakeVcs::default().with_commit("a1", 1, &[("conf.py", "")]);
        let workspace = tempfile::tempdir().unwrap();
        let mut exporter = Exporter::new(&vcs, workspace.path());

        let first = exporter.export(&VersionRecord::new("main", RefKind::Branch, "a1", 1)).unwrap();
        fs::write(first.join("marker"), "").unwrap();
        let second = exporter.export(&VersionRecord::new("v1.0", RefKind::Tag, "a1", 1)).unwrap();

        assert_eq!(first, second);
        assert!(second.join("marker").exists());
    }

    #[test]
    fn test_export_failure_leaves_nothing_behind() {
        let vcs = FakeVcs::default();
        let workspace = tempfile::tempdir().unwrap();
        let mut exporter = Exporter::new(&vcs, workspace.path());

        let err = exporter
            .export(&VersionRecord::new("gone", RefKind::Branch, "dead", 1))
            .unwrap_err();
        assert!(format!("{err:#}").contains("gone"));
        assert!(!workspace.path().join("dead").exists());
    }
}
