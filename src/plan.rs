//! Sync plan - the jobs of one run and how to report them
//!
//! A plan comes either from a YAML config (batch mode) or from a single
//! local/remote pair given on the command line (ad-hoc mode).

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::target::SyncTarget;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub targets: Vec<SyncTarget>,
    pub status_file: Option<PathBuf>,
    pub prune: bool,
}

/// Values that override the config file when given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub status_file: Option<PathBuf>,
    pub remove_branches: bool,
}

impl SyncPlan {
    /// Batch plan covering every repository declared in `config`
    pub fn from_config(config: &Config, overrides: Overrides) -> Self {
        Self {
            targets: config.targets(),
            status_file: overrides.status_file.or_else(|| config.status_file()),
            prune: config.remove_local_branches || overrides.remove_branches,
        }
    }

    /// Plan for one repository given on the command line
    pub fn ad_hoc(
        local_repo: Option<&Path>,
        remote_repo: Option<&str>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let (local_repo, remote_repo) = match (local_repo, remote_repo) {
            (Some(local), Some(remote)) if !remote.trim().is_empty() => (local, remote),
            _ => {
                return Err(ConfigError::InvalidArguments(
                    "--local-repo and --remote-repo are required when running without a configuration file"
                        .to_string(),
                ))
            }
        };

        let local_path = absolute_path(local_repo).map_err(|e| {
            ConfigError::InvalidArguments(format!(
                "cannot resolve local repository path {:?}: {}",
                local_repo, e
            ))
        })?;

        Ok(Self {
            targets: vec![SyncTarget::from_url(local_path, remote_repo)],
            status_file: overrides.status_file,
            prune: overrides.remove_branches,
        })
    }
}

/// Make `path` absolute against the current directory and normalize it
fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(path_clean::clean(joined))
}
