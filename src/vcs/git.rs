use super::{RemoteRef, Vcs, parse_ls_remote};
use crate::{
    debug, exec,
    utils::exec::{FilterRule, SILENT_FILTER, exec_piped, internal::to_cmd_vec},
};
use anyhow::{Context, Result, anyhow};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// `git ls-remote` prints this when the remote is the repository itself.
const LS_REMOTE_FILTER: FilterRule = FilterRule::new(&["From "]);

/// Git through the command line, scoped to one repository and one remote.
///
/// The working checkout is never touched: reads go through `git show` /
/// `git cat-file` and exports through `git archive`.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    remote: String,
}

impl GitCli {
    /// Find the repository containing `path`.
    pub fn open(path: &Path, remote: &str) -> Result<Self> {
        let repo = gix::discover(path)
            .with_context(|| format!("Failed to find local git repository root in {path:?}."))?;
        let root = get_repo_root(&repo)?.to_path_buf();

        if repo.find_remote(remote).is_err() {
            debug!("git"; "`{remote}` is not a configured remote, using it as a url or path");
        }

        Ok(Self {
            root,
            remote: remote.to_owned(),
        })
    }

    /// Working tree root of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn verify_commit(&self, sha: &str) -> Result<()> {
        exec!(filter=&SILENT_FILTER; &self.root; ["git"]; "cat-file", "-e", format!("{sha}^{{commit}}"))
            .map(|_| ())
            .with_context(|| format!("Commit {sha} is not available locally"))
    }
}

/// Get repository root path
fn get_repo_root(repo: &gix::Repository) -> Result<&Path> {
    repo.path()
        .parent()
        .ok_or_else(|| anyhow!("Invalid repository path"))
}

impl Vcs for GitCli {
    fn list_remote_refs(&self) -> Result<Vec<RemoteRef>> {
        let output = exec!(
            filter=&LS_REMOTE_FILTER;
            &self.root;
            ["git"];
            "ls-remote", "--heads", "--tags", &self.remote
        )
        .with_context(|| format!("Failed to list refs of remote `{}`", self.remote))?;

        Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
    }

    fn file_exists(&self, sha: &str, path: &str) -> Result<bool> {
        self.verify_commit(sha)?;
        let found = exec!(filter=&SILENT_FILTER; &self.root; ["git"]; "cat-file", "-e", format!("{sha}:{path}"));
        Ok(found.is_ok())
    }

    fn read_file(&self, sha: &str, path: &str) -> Result<String> {
        let output = exec!(filter=&SILENT_FILTER; &self.root; ["git"]; "show", format!("{sha}:{path}"))
            .with_context(|| format!("Failed to read {path} at {sha}"))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn commit_timestamp(&self, sha: &str) -> Result<i64> {
        let output = exec!(filter=&SILENT_FILTER; &self.root; ["git"]; "show", "-s", "--format=%ct", sha)
            .with_context(|| format!("Failed to read commit {sha}"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse()
            .with_context(|| format!("Unexpected commit timestamp `{}` for {sha}", stdout.trim()))
    }

    fn export(&self, sha: &str, dest: &Path) -> Result<()> {
        let cmd = to_cmd_vec(["git"]);
        let args = [OsString::from("archive"), OsString::from("--format=tar"), OsString::from(sha)];
        exec_piped(&self.root, &cmd, &args, &SILENT_FILTER, |stdout| {
            tar::Archive::new(stdout)
                .unpack(dest)
                .with_context(|| format!("Failed to unpack {sha} into {}", dest.display()))
        })
        .with_context(|| format!("Failed to archive {sha}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versions::RefKind;
    use std::fs;
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(["-c", "user.name=verdocs", "-c", "user.email=verdocs@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    }

    /// Repository with `main` (docs/conf.py) and annotated tag `v1.0`,
    /// acting as its own remote.
    fn fixture() -> (tempfile::TempDir, GitCli, String) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        git(root, &["init", "-q"]);
        git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        fs::create_dir_all(root.join("docs/sub")).unwrap();
        fs::write(root.join("docs/conf.py"), "root_doc = \"contents\"\n").unwrap();
        fs::write(root.join("docs/sub/page.rst"), "Page\n====\n").unwrap();
        git(root, &["add", "."]);
        git(root, &["commit", "-q", "-m", "docs"]);
        git(root, &["tag", "-a", "v1.0", "-m", "release"]);
        let sha = git(root, &["rev-parse", "HEAD"]);

        let cli = GitCli::open(root, ".").unwrap();
        (dir, cli, sha)
    }

    #[test]
    fn test_open_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GitCli::open(&dir.path().join("missing"), "origin").is_err());
    }

    #[test]
    fn test_list_remote_refs_peels_tags() {
        let (_dir, cli, sha) = fixture();
        let refs = cli.list_remote_refs().unwrap();
        assert_eq!(
            refs,
            vec![
                RemoteRef {
                    name: "main".into(),
                    kind: RefKind::Branch,
                    sha: sha.clone(),
                },
                RemoteRef {
                    name: "v1.0".into(),
                    kind: RefKind::Tag,
                    sha,
                },
            ]
        );
    }

    #[test]
    fn test_file_queries() {
        let (_dir, cli, sha) = fixture();
        assert!(cli.file_exists(&sha, "docs/conf.py").unwrap());
        assert!(!cli.file_exists(&sha, "conf.py").unwrap());
        assert!(cli.read_file(&sha, "docs/conf.py").unwrap().contains("contents"));
        assert!(cli.commit_timestamp(&sha).unwrap() > 0);
    }

    #[test]
    fn test_unknown_commit_is_an_error() {
        let (_dir, cli, _) = fixture();
        let missing = "0123456789abcdef0123456789abcdef01234567";
        assert!(cli.file_exists(missing, "docs/conf.py").is_err());
        assert!(cli.commit_timestamp(missing).is_err());
    }

    #[test]
    fn test_export_writes_full_tree() {
        let (_dir, cli, sha) = fixture();
        let out = tempfile::tempdir().unwrap();
        cli.export(&sha, out.path()).unwrap();
        assert!(out.path().join("docs/conf.py").is_file());
        assert!(out.path().join("docs/sub/page.rst").is_file());
    }

    #[test]
    fn test_export_unknown_commit_fails() {
        let (_dir, cli, _) = fixture();
        let out = tempfile::tempdir().unwrap();
        let err = cli.export("0123456789abcdef0123456789abcdef01234567", out.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to archive"));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
