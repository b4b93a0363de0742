use dirs::config_dir;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::target::{remote_url, SyncTarget};

/// Main configuration structure for git-bare-sync
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the subdirectories of local bare repositories
    pub repo_root: String,

    /// Remote git server (hostname, or URL such as `https://git.example.com`)
    pub remote_server: String,

    /// SSH user for scp-style remotes
    #[serde(default)]
    pub remote_user: Option<String>,

    /// Status file written after every run
    #[serde(default)]
    pub metrics: Option<String>,

    /// Prune local branches that were deleted on the remote
    #[serde(default)]
    pub remove_local_branches: bool,

    /// Repositories grouped by subdirectory of `repo_root`
    #[serde(default)]
    pub repos: Vec<RepoGroup>,
}

/// One subdirectory of `repo_root` and the repositories inside it
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RepoGroup {
    pub subdirectory: String,

    /// Local repository name to remote repository identifier, in file order
    #[serde(default, deserialize_with = "deserialize_repo_pairs")]
    pub git_repo: Vec<RepoPair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPair {
    pub local: String,
    pub remote: String,
}

impl RepoPair {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

// serde_yaml::Mapping keeps insertion order, a HashMap would not
fn deserialize_repo_pairs<'de, D>(deserializer: D) -> Result<Vec<RepoPair>, D::Error>
where
    D: Deserializer<'de>,
{
    let mapping = Option::<serde_yaml::Mapping>::deserialize(deserializer)?.unwrap_or_default();

    mapping
        .into_iter()
        .map(|(key, value)| match (key.as_str(), value.as_str()) {
            (Some(local), Some(remote)) => Ok(RepoPair::new(local, remote)),
            _ => Err(D::Error::custom(format!(
                "git_repo entries must map a local repository name to a remote name, got {:?}: {:?}",
                key, value
            ))),
        })
        .collect()
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.expand_paths()?;
        config.validate()?;

        tracing::debug!(
            "Loaded {} repositories in {} subdirectories from {:?}",
            config.repository_count(),
            config.repos.len(),
            path
        );

        Ok(config)
    }

    /// Parse configuration without touching the filesystem
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("git-bare-sync").join("config.yml"))
    }

    /// Expand `~` and environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<(), ConfigError> {
        self.repo_root = shellexpand::full(&self.repo_root)
            .map_err(|e| ConfigError::Expand {
                field: "repo_root",
                message: e.to_string(),
            })?
            .into_owned();

        if let Some(metrics) = &self.metrics {
            let expanded = shellexpand::full(metrics).map_err(|e| ConfigError::Expand {
                field: "metrics",
                message: e.to_string(),
            })?;
            self.metrics = Some(expanded.into_owned());
        }

        Ok(())
    }

    /// Reject blank required values that serde accepts as present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_root.trim().is_empty() {
            return Err(ConfigError::MissingField("repo_root".to_string()));
        }
        if self.remote_server.trim().is_empty() {
            return Err(ConfigError::MissingField("remote_server".to_string()));
        }
        if let Some(index) = self
            .repos
            .iter()
            .position(|group| group.subdirectory.trim().is_empty())
        {
            return Err(ConfigError::MissingField(format!(
                "repos[{}].subdirectory",
                index
            )));
        }
        Ok(())
    }

    pub fn repository_count(&self) -> usize {
        self.repos.iter().map(|group| group.git_repo.len()).sum()
    }

    /// Status file path, if one is configured
    pub fn status_file(&self) -> Option<PathBuf> {
        self.metrics
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(PathBuf::from)
    }

    /// One sync target per declared repository, in declaration order
    pub fn targets(&self) -> Vec<SyncTarget> {
        let root = PathBuf::from(&self.repo_root);

        self.repos
            .iter()
            .flat_map(|group| {
                let group_dir = root.join(&group.subdirectory);
                group.git_repo.iter().map(move |pair| {
                    SyncTarget::new(
                        group_dir.join(&pair.local),
                        pair.remote.clone(),
                        remote_url(
                            &self.remote_server,
                            self.remote_user.as_deref(),
                            &pair.remote,
                        ),
                    )
                })
            })
            .collect()
    }
}
