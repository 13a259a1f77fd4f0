//! Version control access.
//!
//! The pipeline only ever asks five questions of the repository, collected in
//! the [`Vcs`] trait. [`GitCli`] answers them with the git command line.

mod git;

pub use git::GitCli;

use crate::versions::RefKind;
use anyhow::Result;
use std::{collections::BTreeMap, path::Path};

/// A branch or tag on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub name: String,
    pub kind: RefKind,
    /// Commit id (peeled for annotated tags)
    pub sha: String,
}

pub trait Vcs {
    /// Branches and tags of the configured remote.
    fn list_remote_refs(&self) -> Result<Vec<RemoteRef>>;

    /// Whether `path` exists at `sha`.
    ///
    /// # Errors
    /// When the commit itself cannot be read.
    fn file_exists(&self, sha: &str, path: &str) -> Result<bool>;

    /// Contents of `path` at `sha`.
    fn read_file(&self, sha: &str, path: &str) -> Result<String>;

    /// Commit timestamp of `sha`, unix seconds.
    fn commit_timestamp(&self, sha: &str) -> Result<i64>;

    /// Write the full tree of `sha` into `dest`.
    fn export(&self, sha: &str, dest: &Path) -> Result<()>;
}

/// Join a doc root and a file name into a repository path.
pub fn repo_path(doc_root: &str, file: &str) -> String {
    match doc_root.trim_matches('/') {
        "" | "." => file.to_owned(),
        dir => format!("{dir}/{file}"),
    }
}

/// Parse `git ls-remote --heads --tags` output.
///
/// Annotated tags appear twice; the peeled `^{}` line wins so tags always
/// point at commits.
pub fn parse_ls_remote(output: &str) -> Vec<RemoteRef> {
    let mut refs: BTreeMap<(RefKind, String), (String, bool)> = BTreeMap::new();

    for line in output.lines() {
        let Some((sha, full_name)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let full_name = full_name.trim();

        let (kind, name) = if let Some(name) = full_name.strip_prefix("refs/heads/") {
            (RefKind::Branch, name)
        } else if let Some(name) = full_name.strip_prefix("refs/tags/") {
            (RefKind::Tag, name)
        } else {
            continue;
        };

        let (name, peeled) = match name.strip_suffix("^{}") {
            Some(name) => (name, true),
            None => (name, false),
        };

        let entry = refs
            .entry((kind, name.to_owned()))
            .or_insert_with(|| (sha.to_owned(), peeled));
        if peeled {
            *entry = (sha.to_owned(), true);
        }
    }

    refs.into_iter()
        .map(|((kind, name), (sha, _))| RemoteRef { name, kind, sha })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_path() {
        assert_eq!(repo_path(".", "conf.py"), "conf.py");
        assert_eq!(repo_path("", "conf.py"), "conf.py");
        assert_eq!(repo_path("docs", "conf.py"), "docs/conf.py");
        assert_eq!(repo_path("docs/", "conf.py"), "docs/conf.py");
    }

    fn remote(name: &str, kind: RefKind, sha: &str) -> RemoteRef {
        RemoteRef {
            name: name.into(),
            kind,
            sha: sha.into(),
        }
    }

    #[test]
    fn test_parse_ls_remote() {
        let output = "\
aaaa\trefs/heads/main
bbbb\trefs/heads/robpol86/feature
cccc\trefs/tags/v1.0
dddd\trefs/tags/v1.0^{}
eeee\trefs/tags/light
ffff\trefs/pull/1/head
";
        let refs = parse_ls_remote(output);
        let expected = vec![
            remote("main", RefKind::Branch, "aaaa"),
            remote("robpol86/feature", RefKind::Branch, "bbbb"),
            remote("light", RefKind::Tag, "eeee"),
            remote("v1.0", RefKind::Tag, "dddd"),
        ];
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_parse_ls_remote_peeled_first() {
        let refs = parse_ls_remote("dddd\trefs/tags/v1.0^{}\ncccc\trefs/tags/v1.0\n");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].sha, "dddd");
    }

    #[test]
    fn test_parse_ls_remote_ignores_noise() {
        assert!(parse_ls_remote("").is_empty());
        assert!(parse_ls_remote("warning: something\n").is_empty());
    }
}
