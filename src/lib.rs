//! git-bare-sync - Keep local bare repositories in sync with a remote server
//!
//! Every configured bare repository gets an `origin` remote pointing at the
//! remote server, all branches are fetched into it and, optionally, branches
//! deleted upstream are pruned. The outcome of each fetch can be written to a
//! JSON status file for monitoring.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration loading and validation
//! - [`plan`]: Turning config or CLI arguments into sync targets
//! - [`git`]: Git operations behind the [`GitBackend`] trait
//! - [`sync`]: Sequential synchronization engine
//! - [`status`]: Status file reporting

pub mod config;
pub mod error;
pub mod git;
pub mod plan;
pub mod status;
pub mod sync;
pub mod target;

pub use config::Config;
pub use error::{ConfigError, StatusWriteError, SyncError};
pub use git::{GitBackend, GitCli};
pub use plan::{Overrides, SyncPlan};
pub use status::{StatusRecord, StatusReporter};
pub use sync::{SyncEngine, SyncSummary};
pub use target::SyncTarget;
