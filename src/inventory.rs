//! Ref discovery: which remote branches and tags have docs.

use crate::error::PipelineError;
use crate::vcs::{RemoteRef, Vcs, repo_path};
use crate::versions::VersionRecord;
use crate::{debug, log};
use anyhow::Result;

/// List remote refs and keep the ones with a doc root.
///
/// A doc root is the first of `sources` that holds `conf_file` at the ref's
/// commit. Refs without one are skipped quietly; refs that cannot be read
/// are skipped with a warning.
///
/// # Errors
/// `NoDocsFound` when no ref qualifies, or the listing itself failed.
pub fn gather_refs(
    vcs: &dyn Vcs,
    sources: &[String],
    conf_file: &str,
) -> Result<Vec<VersionRecord>> {
    let remote_refs = vcs.list_remote_refs()?;
    debug!("refs"; "remote has {} branches/tags", remote_refs.len());

    let mut records = Vec::new();
    for remote_ref in remote_refs {
        match inspect_ref(vcs, &remote_ref, sources, conf_file) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => debug!("refs"; "skipping {}: no {conf_file} in {sources:?}", remote_ref.name),
            Err(err) => log!("warn"; "skipping {}: {err:#}", remote_ref.name),
        }
    }

    if records.is_empty() {
        return Err(PipelineError::NoDocsFound.into());
    }

    let mut names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    log!("refs"; "With docs: {}", names.join(" "));

    Ok(records)
}

fn inspect_ref(
    vcs: &dyn Vcs,
    remote_ref: &RemoteRef,
    sources: &[String],
    conf_file: &str,
) -> Result<Option<VersionRecord>> {
    let mut doc_root = None;
    for source in sources {
        if vcs.file_exists(&remote_ref.sha, &repo_path(source, conf_file))? {
            doc_root = Some(source);
            break;
        }
    }
    let Some(doc_root) = doc_root else {
        return Ok(None);
    };

    let date = vcs.commit_timestamp(&remote_ref.sha)?;
    let mut record = VersionRecord::new(&remote_ref.name, remote_ref.kind, &remote_ref.sha, date);
    record.doc_root = doc_root.trim_matches('/').to_owned();
    if record.doc_root.is_empty() {
        record.doc_root = ".".into();
    }
    Ok(Some(record))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::versions::RefKind;
    use anyhow::{anyhow, bail};
    use rustc_hash::FxHashMap;
    use std::{fs, path::Path};

    /// In-memory repository: commits are maps of path to content.
    #[derive(Default)]
    pub(crate) struct FakeVcs {
        pub refs: Vec<RemoteRef>,
        pub commits: FxHashMap<String, (i64, Vec<(String, String)>)>,
    }

    impl FakeVcs {
        pub(crate) fn with_ref(mut self, name: &str, kind: RefKind, sha: &str) -> Self {
            self.refs.push(RemoteRef {
                name: name.into(),
                kind,
                sha: sha.into(),
            });
            self
        }

        pub(crate) fn with_commit(mut self, sha: &str, date: i64, files: &[(&str, &str)]) -> Self {
            let files = files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect();
            self.commits.insert(sha.into(), (date, files));
            self
        }

        fn commit(&self, sha: &str) -> Result<&(i64, Vec<(String, String)>)> {
            self.commits
                .get(sha)
                .ok_or_else(|| anyhow!("Commit {sha} is not available locally"))
        }
    }

    impl Vcs for FakeVcs {
        fn list_remote_refs(&self) -> Result<Vec<RemoteRef>> {
            Ok(self.refs.clone())
        }

        fn file_exists(&self, sha: &str, path: &str) -> Result<bool> {
            Ok(self.commit(sha)?.1.iter().any(|(p, _)| p == path))
        }

        fn read_file(&self, sha: &str, path: &str) -> Result<String> {
            match self.commit(sha)?.1.iter().find(|(p, _)| p == path) {
                Some((_, content)) => Ok(content.clone()),
                None => bail!("{path} not found at {sha}"),
            }
        }

        fn commit_timestamp(&self, sha: &str) -> Result<i64> {
            Ok(self.commit(sha)?.0)
        }

        fn export(&self, sha: &str, dest: &Path) -> Result<()> {
            for (path, content) in &self.commit(sha)?.1 {
                let target = dest.join(path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(target, content)?;
            }
            Ok(())
        }
    }

    fn sources() -> Vec<String> {
        vec!["docs".into(), ".".into()]
    }

    #[test]
    fn test_gather_refs_picks_first_doc_root() {
        let vcs = FakeVcs::default()
            .with_ref("main", RefKind::Branch, "a1")
            .with_ref("old", RefKind::Branch, "b2")
            .with_commit("a1", 100, &[("docs/conf.py", ""), ("conf.py", "")])
            .with_commit("b2", 50, &[("conf.py", "")]);

        let records = gather_refs(&vcs, &sources(), "conf.py").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].doc_root, "docs");
        assert_eq!(records[0].date, 100);
        assert_eq!(records[1].doc_root, ".");
    }

    #[test]
    fn test_gather_refs_skips_refs_without_docs() {
        let vcs = FakeVcs::default()
            .with_ref("main", RefKind::Branch, "a1")
            .with_ref("gh-pages", RefKind::Branch, "c3")
            .with_commit("a1", 100, &[("docs/conf.py", "")])
            .with_commit("c3", 100, &[("index.html", "")]);

        let records = gather_refs(&vcs, &sources(), "conf.py").unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["main"]);
    }

    #[test]
    fn test_gather_refs_skips_unreadable_refs() {
        let vcs = FakeVcs::default()
            .with_ref("main", RefKind::Branch, "a1")
            .with_ref("v0.1", RefKind::Tag, "gone")
            .with_commit("a1", 100, &[("docs/conf.py", "")]);

        let records = gather_refs(&vcs, &sources(), "conf.py").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RefKind::Branch);
    }

    #[test]
    fn test_gather_refs_nothing_found_is_fatal() {
        let vcs = FakeVcs::default()
            .with_ref("main", RefKind::Branch, "a1")
            .with_commit("a1", 100, &[("README.md", "")]);

        let err = gather_refs(&vcs, &sources(), "conf.py").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No docs found in any remote branch/tag. Nothing to do."
        );
    }
}
