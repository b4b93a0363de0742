//! Sync Engine - Sequential bare repository synchronization
//!
//! Each target is processed on its own: point `origin` at the expected URL,
//! fetch every branch and optionally prune branches removed upstream. A failed
//! target is recorded and the engine moves on to the next one.

use chrono::Utc;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::git::{GitBackend, GitCli, REMOTE_NAME};
use crate::status::StatusRecord;
use crate::target::SyncTarget;

/// What happened to the `origin` remote during a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChange {
    Unchanged,
    Added,
    Updated,
}

/// Details of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub remote: RemoteChange,
    /// Local branches that disappeared during the fetch
    pub pruned: Vec<String>,
}

/// Results from a complete run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub records: Vec<StatusRecord>,
    pub duration: Duration,
    /// The run was stopped before every target was attempted
    pub interrupted: bool,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn successful(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatusRecord> {
        self.records.iter().filter(|r| !r.is_success())
    }
}

/// The main sync engine
pub struct SyncEngine<G = GitCli> {
    git: G,
    prune: bool,
}

impl SyncEngine<GitCli> {
    /// Engine using the system `git` executable
    pub fn with_git_cli(prune: bool) -> Self {
        Self::new(GitCli::new(), prune)
    }
}

impl<G: GitBackend> SyncEngine<G> {
    pub fn new(git: G, prune: bool) -> Self {
        Self { git, prune }
    }

    /// Synchronize a single bare repository with its remote
    pub async fn sync(&self, target: &SyncTarget) -> Result<SyncReport, SyncError> {
        let path = target.local_path.as_path();

        if !path.is_dir() {
            return Err(SyncError::MissingRepository(path.to_path_buf()));
        }

        if !self.git.is_bare_repository(path).await? {
            return Err(SyncError::NotBare(path.to_path_buf()));
        }

        let remote = self.ensure_remote(target).await?;

        let before = self.git.local_branches(path).await?;
        self.git.fetch(path, REMOTE_NAME, self.prune).await?;
        let after = self.git.local_branches(path).await?;

        let pruned: Vec<String> = before
            .into_iter()
            .filter(|branch| !after.contains(branch))
            .collect();

        if !pruned.is_empty() {
            info!("Pruned {} branches in {}: {}", pruned.len(), target.name, pruned.join(", "));
        }

        Ok(SyncReport { remote, pruned })
    }

    /// Make `origin` the only remote and point it at the target's URL
    async fn ensure_remote(&self, target: &SyncTarget) -> Result<RemoteChange, SyncError> {
        let path = target.local_path.as_path();
        let remotes = self.git.remotes(path).await?;

        if remotes.iter().any(|name| name != REMOTE_NAME) {
            return Err(SyncError::UnexpectedRemotes {
                path: path.to_path_buf(),
                remotes,
            });
        }

        if remotes.is_empty() {
            info!("Adding remote {} -> {} for {}", REMOTE_NAME, target.remote_url, target.name);
            self.git
                .add_remote(path, REMOTE_NAME, &target.remote_url)
                .await?;
            return Ok(RemoteChange::Added);
        }

        match self.git.remote_url(path, REMOTE_NAME).await? {
            Some(url) if url == target.remote_url => {
                debug!("Remote {} already points at {}", REMOTE_NAME, url);
                Ok(RemoteChange::Unchanged)
            }
            current => {
                info!(
                    "Updating remote {} for {}: {} -> {}",
                    REMOTE_NAME,
                    target.name,
                    current.as_deref().unwrap_or("<none>"),
                    target.remote_url
                );
                self.git
                    .set_remote_url(path, REMOTE_NAME, &target.remote_url)
                    .await?;
                Ok(RemoteChange::Updated)
            }
        }
    }

    /// Synchronize every target in order until done or `shutdown` resolves
    pub async fn sync_all<F>(&self, targets: &[SyncTarget], shutdown: F) -> SyncSummary
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let mut records = Vec::with_capacity(targets.len());
        let mut interrupted = false;

        tokio::pin!(shutdown);

        info!("Syncing {} repositories (prune: {})", targets.len(), self.prune);

        for target in targets {
            info!("Fetching {} from {}", target.local_path.display(), target.remote_url);

            let result = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Interrupted while syncing {}, stopping", target.name);
                    interrupted = true;
                    break;
                }
                result = self.sync(target) => result,
            };

            let record = match result {
                Ok(report) => {
                    info!("Synced {}", target.id());
                    StatusRecord::success(target, Utc::now(), report.pruned)
                }
                Err(e) => {
                    error!("Failed to sync {}: {}", target.id(), e);
                    StatusRecord::failure(target, Utc::now(), &e)
                }
            };
            records.push(record);
        }

        let summary = SyncSummary {
            records,
            duration: start_time.elapsed(),
            interrupted,
        };

        info!(
            "Sync completed in {:.2}s: {} successful, {} failed",
            summary.duration.as_secs_f64(),
            summary.successful(),
            summary.failed()
        );

        summary
    }
}
