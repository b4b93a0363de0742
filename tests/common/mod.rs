//! Common test utilities: scratch "server" and local bare repositories
#![allow(dead_code)]

use assert_fs::TempDir;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run git in `dir` and return trimmed stdout, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Scratch layout with a directory of remote repositories and a repo root
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub remotes_dir: PathBuf,
    pub repo_root: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let remotes_dir = temp_dir.path().join("remotes");
        let repo_root = temp_dir.path().join("repos");
        std::fs::create_dir_all(&remotes_dir).expect("Failed to create remotes dir");
        std::fs::create_dir_all(&repo_root).expect("Failed to create repo root");

        Self {
            temp_dir,
            remotes_dir,
            repo_root,
        }
    }

    /// `file://` URL usable as `remote_server` in a config
    pub fn remote_server(&self) -> String {
        format!("file://{}", self.remotes_dir.display())
    }

    /// Create a bare repository on the "server" holding `branches`
    pub fn create_remote(&self, name: &str, branches: &[&str]) -> PathBuf {
        let remote = self.remotes_dir.join(name);
        git(self.temp_dir.path(), &["init", "--bare", remote.to_str().unwrap()]);

        let work = self.temp_dir.path().join(format!("work-{}", name));
        git(self.temp_dir.path(), &["init", "-b", "main", work.to_str().unwrap()]);
        std::fs::write(work.join("README.md"), format!("# {}\n", name))
            .expect("Failed to write README");
        git(&work, &["add", "README.md"]);
        git(
            &work,
            &[
                "-c",
                "user.name=Test User",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "-m",
                "Initial commit",
            ],
        );
        for branch in branches.iter().filter(|b| **b != "main") {
            git(&work, &["branch", branch]);
        }
        git(&work, &["push", remote.to_str().unwrap(), "--all"]);

        remote
    }

    pub fn delete_remote_branch(&self, name: &str, branch: &str) {
        git(&self.remotes_dir.join(name), &["branch", "-D", branch]);
    }

    /// Create an empty local bare repository under `repo_root/subdirectory`
    pub fn create_local(&self, subdirectory: &str, name: &str) -> PathBuf {
        let path = self.repo_root.join(subdirectory).join(name);
        git(self.temp_dir.path(), &["init", "--bare", path.to_str().unwrap()]);
        path
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join("config.yml");
        std::fs::write(&path, content).expect("Failed to write test config");
        path
    }
}

/// Sorted local branch names of a repository
pub fn local_branches(repo: &Path) -> Vec<String> {
    let output = git(repo, &["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads"]);
    let mut branches: Vec<String> = output
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    branches.sort();
    branches
}

pub fn origin_url(repo: &Path) -> String {
    git(repo, &["config", "--get", "remote.origin.url"])
}

/// Add a tag to the default branch of a "server" repository
pub fn tag_remote(remote: &Path, tag: &str) {
    git(remote, &["tag", tag, "main"]);
}
