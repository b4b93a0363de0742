//! Sync targets and remote URL resolution

use std::path::{Path, PathBuf};

/// A single local bare repository and the remote it mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Directory name of the local repository (e.g. "service.git")
    pub name: String,

    /// Absolute path to the local bare repository
    pub local_path: PathBuf,

    /// Remote repository as declared (e.g. "team-a/service.git")
    pub remote_identifier: String,

    /// Fully resolved fetch URL
    pub remote_url: String,
}

impl SyncTarget {
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_identifier: impl Into<String>,
        remote_url: impl Into<String>,
    ) -> Self {
        let local_path = local_path.into();
        let name = repo_name(&local_path);

        Self {
            name,
            local_path,
            remote_identifier: remote_identifier.into(),
            remote_url: remote_url.into(),
        }
    }

    /// Target whose remote is given as a complete URL
    pub fn from_url(local_path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(local_path, url.clone(), url)
    }

    /// Key used for this target in the status file
    pub fn id(&self) -> String {
        format!("{}:{}", self.name, self.remote_identifier)
    }
}

fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build the fetch URL for `identifier` on `server`.
///
/// URL-style servers (`https://`, `ssh://`, `file://`) are joined with a slash,
/// anything else is treated as an scp-style SSH host.
pub fn remote_url(server: &str, user: Option<&str>, identifier: &str) -> String {
    if server.contains("://") {
        return format!(
            "{}/{}",
            server.trim_end_matches('/'),
            identifier.trim_start_matches('/')
        );
    }

    match user.filter(|u| !u.is_empty()) {
        Some(user) => format!("{}@{}:{}", user, server, identifier),
        None => format!("{}:{}", server, identifier),
    }
}
