use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::SyncError;

/// Name of the remote every managed repository fetches from
pub const REMOTE_NAME: &str = "origin";

/// Refspec that mirrors remote branches straight into local branches
pub const MIRROR_REFSPEC: &str = "+refs/heads/*:refs/heads/*";

/// Stderr fragments git prints when the remote side cannot be reached
const UNREACHABLE_MARKERS: &[&str] = &[
    "Could not read from remote repository",
    "does not appear to be a git repository",
    "unable to access",
    "Could not resolve host",
    "Repository not found",
];

/// Git operations needed to keep a bare repository in sync
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn is_bare_repository(&self, repo: &Path) -> Result<bool, SyncError>;

    /// Names of all configured remotes
    async fn remotes(&self, repo: &Path) -> Result<Vec<String>, SyncError>;

    /// URL as configured, without `insteadOf` rewriting
    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>, SyncError>;

    async fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<(), SyncError>;

    async fn set_remote_url(&self, repo: &Path, remote: &str, url: &str)
        -> Result<(), SyncError>;

    /// Names of all local branches, without the `refs/heads/` prefix
    async fn local_branches(&self, repo: &Path) -> Result<Vec<String>, SyncError>;

    /// Fetch every branch of `remote` into the local branches
    async fn fetch(&self, repo: &Path, remote: &str, prune: bool) -> Result<(), SyncError>;
}

/// [`GitBackend`] backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, repo: &Path, args: &[&str]) -> Result<String, SyncError> {
        debug!("Running git {} in {}", args.join(" "), repo.display());

        let output = AsyncCommand::new("git")
            .args(args)
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(SyncError::Spawn)?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(SyncError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn is_bare_repository(&self, repo: &Path) -> Result<bool, SyncError> {
        let output = self
            .run(repo, &["rev-parse", "--is-bare-repository"])
            .await?;
        Ok(output == "true")
    }

    async fn remotes(&self, repo: &Path) -> Result<Vec<String>, SyncError> {
        let output = self.run(repo, &["remote"]).await?;
        Ok(non_empty_lines(&output))
    }

    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>, SyncError> {
        // the configured value, before any url.<base>.insteadOf rewriting;
        // `config --get` exits non-zero when the key is unset
        let key = format!("remote.{}.url", remote);
        match self.run(repo, &["config", "--get", key.as_str()]).await {
            Ok(url) if !url.is_empty() => Ok(Some(url)),
            Ok(_) => Ok(None),
            Err(SyncError::Git { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn add_remote(&self, repo: &Path, remote: &str, url: &str) -> Result<(), SyncError> {
        self.run(repo, &["remote", "add", remote, url]).await?;
        Ok(())
    }

    async fn set_remote_url(
        &self,
        repo: &Path,
        remote: &str,
        url: &str,
    ) -> Result<(), SyncError> {
        self.run(repo, &["remote", "set-url", remote, url]).await?;
        Ok(())
    }

    async fn local_branches(&self, repo: &Path) -> Result<Vec<String>, SyncError> {
        let output = self
            .run(
                repo,
                &["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads"],
            )
            .await?;
        Ok(non_empty_lines(&output))
    }

    async fn fetch(&self, repo: &Path, remote: &str, prune: bool) -> Result<(), SyncError> {
        // explicit either way so fetch.prune / remote.<name>.prune are ignored
        let mut args = vec!["fetch", if prune { "--prune" } else { "--no-prune" }];
        args.extend([remote, MIRROR_REFSPEC]);

        self.run(repo, &args)
            .await
            .map(|_| ())
            .map_err(|e| classify_fetch_error(remote, e))
    }
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn classify_fetch_error(remote: &str, error: SyncError) -> SyncError {
    match error {
        SyncError::Git { stderr, .. }
            if UNREACHABLE_MARKERS.iter().any(|m| stderr.contains(m)) =>
        {
            SyncError::RemoteUnreachable {
                remote: remote.to_string(),
                detail: stderr,
            }
        }
        other => other,
    }
}
