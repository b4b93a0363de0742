use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use git_bare_sync::{
    Config, ConfigError, Overrides, StatusReporter, SyncEngine, SyncPlan, SyncSummary,
};

#[derive(Parser)]
#[command(name = "git-bare-sync")]
#[command(about = "Set remotes on local bare repositories and fetch updates from a remote git server")]
#[command(version)]
struct Cli {
    /// What to do: fetch from remotes, or print the status file
    #[arg(value_enum, default_value_t = Action::Fetch)]
    action: Action,

    /// Configuration file; --local-repo and --remote-repo are ignored when set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a local bare git repository (ad-hoc mode)
    #[arg(long)]
    local_repo: Option<PathBuf>,

    /// Full URL of the repository on the remote server (ad-hoc mode)
    #[arg(long)]
    remote_repo: Option<String>,

    /// Prune local branches that no longer exist on the remote
    #[arg(long)]
    remove_branches: bool,

    /// File to record fetch statuses in
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Set remotes and fetch from the remote server
    Fetch,
    /// Print the contents of the status file
    Metric,
}

const EXIT_SYNC_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            if e.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::from(EXIT_SYNC_FAILED)
            }
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for the summary and `metric` output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let plan = build_plan(&cli)?;

    match cli.action {
        Action::Metric => cmd_metric(&plan),
        Action::Fetch => Ok(cmd_fetch(plan).await),
    }
}

/// Resolve the run's targets from the config file or the ad-hoc flags
fn build_plan(cli: &Cli) -> Result<SyncPlan, ConfigError> {
    let overrides = Overrides {
        status_file: cli.status_file.clone(),
        remove_branches: cli.remove_branches,
    };

    let config_path = cli.config.clone().or_else(|| {
        if cli.local_repo.is_some() || cli.remote_repo.is_some() {
            return None;
        }
        Config::default_config_path().filter(|path| path.exists())
    });

    if let Some(path) = config_path {
        if cli.local_repo.is_some() || cli.remote_repo.is_some() {
            warn!("--local-repo and --remote-repo are ignored when a configuration file is used");
        }
        info!("Loading configuration from {:?}", path);
        let config = Config::load(&path)?;
        return Ok(SyncPlan::from_config(&config, overrides));
    }

    // metric only needs the status file
    if cli.action == Action::Metric {
        return match overrides.status_file {
            Some(status_file) => Ok(SyncPlan {
                targets: Vec::new(),
                status_file: Some(status_file),
                prune: false,
            }),
            None => Err(ConfigError::InvalidArguments(
                "--status-file is required for `metric` when running without a configuration file"
                    .to_string(),
            )),
        };
    }

    SyncPlan::ad_hoc(
        cli.local_repo.as_deref(),
        cli.remote_repo.as_deref(),
        overrides,
    )
}

/// Print the status file for monitoring
fn cmd_metric(plan: &SyncPlan) -> Result<ExitCode> {
    let Some(path) = &plan.status_file else {
        return Err(ConfigError::InvalidArguments(
            "no status file configured (set `metrics` or pass --status-file)".to_string(),
        )
        .into());
    };

    match StatusReporter::read(path) {
        Ok(content) => {
            println!("{}", content);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Failed to read status file {:?}: {}", path, e);
            Ok(ExitCode::from(EXIT_SYNC_FAILED))
        }
    }
}

/// Sync every planned target, then write the status file
async fn cmd_fetch(plan: SyncPlan) -> ExitCode {
    let engine = SyncEngine::with_git_cli(plan.prune);
    let summary = engine.sync_all(&plan.targets, shutdown_signal()).await;

    let reporter = StatusReporter::new(plan.status_file);
    match reporter.report(&summary.records) {
        Ok(true) => {
            if let Some(path) = reporter.path() {
                info!("Status written to {:?}", path);
            }
        }
        Ok(false) => {}
        Err(e) => warn!("{}", e),
    }

    print_summary(&summary);

    if summary.interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if summary.failed() > 0 {
        ExitCode::from(EXIT_SYNC_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_summary(summary: &SyncSummary) {
    println!(
        "Synced {}/{} repositories in {:.2}s",
        summary.successful(),
        summary.total(),
        summary.duration.as_secs_f64()
    );

    for record in summary.failures() {
        println!(
            "  failed {}: {}",
            record.target,
            record.error.as_deref().unwrap_or("unknown error")
        );
    }

    if summary.interrupted {
        println!("  interrupted before all repositories were processed");
    }
}
