mod common;

use assert_fs::prelude::*;
use common::{local_branches, TestEnvironment};
use predicates::prelude::*;
use std::process::{Command, Output};

/// Integration tests for the git-bare-sync binary
/// These tests run the actual binary against scratch git repositories

fn run_cli(env: &TestEnvironment, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_git-bare-sync"))
        .args(args)
        .current_dir(env.temp_dir.path())
        // keep a real user config out of the picture
        .env("XDG_CONFIG_HOME", env.temp_dir.path().join("xdg"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn status_json(path: &std::path::Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("Failed to read status file");
    serde_json::from_str(&content).expect("Status file is not valid JSON")
}

#[test]
fn test_cli_help() {
    let env = TestEnvironment::new();
    let output = run_cli(&env, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    for flag in [
        "--config",
        "--local-repo",
        "--remote-repo",
        "--remove-branches",
        "--status-file",
    ] {
        assert!(stdout.contains(flag), "help is missing {}", flag);
    }
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("metric"));
}

#[test]
fn test_cli_version() {
    let env = TestEnvironment::new();
    let output = run_cli(&env, &["--version"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("git-bare-sync"));
}

#[test]
fn test_ad_hoc_requires_local_and_remote() {
    let env = TestEnvironment::new();
    let output = run_cli(&env, &["--local-repo", "repos/app.git"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--remote-repo"));
}

#[test]
fn test_invalid_config_aborts_before_sync() {
    let env = TestEnvironment::new();
    let config = env.write_config("invalid: yaml: content: [");

    let output = run_cli(&env, &["--config", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse"));
}

#[test]
fn test_missing_required_config_key() {
    let env = TestEnvironment::new();
    let config = env.write_config("remote_server: git.example.com\n");

    let output = run_cli(&env, &["-c", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("repo_root"));
}

#[test]
fn test_ad_hoc_sync_without_status_file() {
    let env = TestEnvironment::new();
    let remote = env.create_remote("app.git", &["main", "develop"]);
    let local = env.create_local("team", "app.git");

    let output = run_cli(
        &env,
        &[
            "--local-repo",
            local.to_str().unwrap(),
            "--remote-repo",
            remote.to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(local_branches(&local), vec!["develop", "main"]);

    let entries: Vec<_> = std::fs::read_dir(env.temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert!(entries.is_empty(), "no status file should be written");
}

#[test]
fn test_ad_hoc_sync_with_status_file_and_prune() {
    let env = TestEnvironment::new();
    let remote = env.create_remote("app.git", &["main", "old"]);
    let local = env.create_local("team", "app.git");
    let status = assert_fs::NamedTempFile::new("status.json").unwrap();

    let args = [
        "--local-repo",
        local.to_str().unwrap(),
        "--remote-repo",
        remote.to_str().unwrap(),
        "--remove-branches",
        "--status-file",
        status.path().to_str().unwrap(),
    ];
    assert!(run_cli(&env, &args).status.success());

    env.delete_remote_branch("app.git", "old");
    assert!(run_cli(&env, &args).status.success());

    assert_eq!(local_branches(&local), vec!["main"]);
    status.assert(predicate::path::exists());

    let report = status_json(status.path());
    let statuses = report["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["outcome"], "success");
    assert_eq!(statuses[0]["pruned_branches"][0], "old");
}

#[test]
fn test_second_subdirectory_unreachable() {
    let env = TestEnvironment::new();
    env.create_remote("alpha.git", &["main"]);
    let alpha = env.create_local("first", "alpha.git");
    env.create_local("second", "beta.git");

    let status = env.temp_dir.child("status.json");
    let config = env.write_config(&format!(
        r#"
repo_root: {root}
remote_server: {server}
metrics: {status}
repos:
  - subdirectory: first
    git_repo:
      alpha.git: alpha.git
  - subdirectory: second
    git_repo:
      beta.git: no-such-remote.git
"#,
        root = env.repo_root.display(),
        server = env.remote_server(),
        status = status.path().display(),
    ));

    let output = run_cli(&env, &["-c", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(local_branches(&alpha), vec!["main"]);

    status.assert(predicate::path::exists());
    let report = status_json(status.path());
    let statuses = report["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0]["target"], "alpha.git:alpha.git");
    assert_eq!(statuses[0]["outcome"], "success");
    assert_eq!(statuses[1]["target"], "beta.git:no-such-remote.git");
    assert_eq!(statuses[1]["outcome"], "failure");
    assert!(statuses[1]["error"].as_str().unwrap().contains("no-such-remote.git"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Synced 1/2"));
    assert!(stdout.contains("beta.git:no-such-remote.git"));
}

#[test]
fn test_missing_local_repository_in_config() {
    let env = TestEnvironment::new();
    env.create_remote("alpha.git", &["main"]);
    let alpha = env.create_local("team", "alpha.git");

    let status = env.temp_dir.child("status.json");
    let config = env.write_config(&format!(
        r#"
repo_root: {root}
remote_server: {server}
metrics: {status}
repos:
  - subdirectory: team
    git_repo:
      ghost.git: alpha.git
      alpha.git: alpha.git
"#,
        root = env.repo_root.display(),
        server = env.remote_server(),
        status = status.path().display(),
    ));

    let output = run_cli(&env, &["-c", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(local_branches(&alpha), vec!["main"]);

    let report = status_json(status.path());
    assert_eq!(report["statuses"][0]["outcome"], "failure");
    assert_eq!(report["statuses"][1]["outcome"], "success");
}

#[test]
fn test_unwritable_status_file_does_not_fail_run() {
    let env = TestEnvironment::new();
    let remote = env.create_remote("app.git", &["main"]);
    let local = env.create_local("team", "app.git");
    let status = env.temp_dir.path().join("no-such-dir").join("status.json");

    let output = run_cli(
        &env,
        &[
            "--local-repo",
            local.to_str().unwrap(),
            "--remote-repo",
            remote.to_str().unwrap(),
            "--status-file",
            status.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to write status file"));
}

#[test]
fn test_metric_prints_status_file() {
    let env = TestEnvironment::new();
    let status = env.temp_dir.child("status.json");
    status
        .write_str(r#"{"updated_at": 1, "statuses": []}"#)
        .unwrap();

    let output = run_cli(&env, &["metric", "--status-file", status.path().to_str().unwrap()]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"updated_at\": 1"));
}

#[test]
fn test_metric_missing_status_file() {
    let env = TestEnvironment::new();
    let status = env.temp_dir.path().join("absent.json");

    let output = run_cli(&env, &["metric", "--status-file", status.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
}
