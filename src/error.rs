//! Error types for git-bare-sync
//!
//! Configuration errors abort a run before anything is fetched, sync errors
//! are scoped to a single target, and status write errors are only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the YAML config or the command line arguments
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to expand `{field}`: {message}")]
    Expand { field: &'static str, message: String },

    /// Required key present but blank
    #[error("missing config field `{0}`")]
    MissingField(String),

    #[error("{0}")]
    InvalidArguments(String),
}

/// Failure to synchronize one target
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("local repository not found: {}", .0.display())]
    MissingRepository(PathBuf),

    #[error("not a bare git repository: {}", .0.display())]
    NotBare(PathBuf),

    #[error(
        "unexpected remotes {remotes:?} in {}, resolve the conflict manually",
        path.display()
    )]
    UnexpectedRemotes { path: PathBuf, remotes: Vec<String> },

    #[error("could not read from remote repository `{remote}`: {detail}")]
    RemoteUnreachable { remote: String, detail: String },

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("failed to execute git: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Status file could not be written
#[derive(Error, Debug)]
pub enum StatusWriteError {
    #[error("failed to write status file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize status report: {0}")]
    Serialize(#[from] serde_json::Error),
}
