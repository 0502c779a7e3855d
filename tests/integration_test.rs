mod helpers;

use gitpane::{ChangeState, GitError, Repository, Settings};
use helpers::{commit_file, scratch_repo, stage_file};
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn test_full_stage_commit_cycle() {
    let (_temp, repo_path) = scratch_repo();
    let repo = Repository::discover_from(&repo_path).expect("Failed to discover repository");

    fs::write(repo_path.join("app.rs"), "fn main() {}").unwrap();
    repo.refresh().await.unwrap();

    let snapshot = repo.changes();
    assert_eq!(snapshot.unstaged.len(), 1);
    assert_eq!(snapshot.unstaged[0].state, ChangeState::Added);

    let change = snapshot.unstaged[0].clone();
    repo.stage(&change).await.unwrap();
    assert_eq!(repo.changes().staged.len(), 1);

    assert!(repo.commit("add app").await.unwrap());

    // Mutations refresh before returning; everything is already current.
    assert!(repo.changes().is_empty());
    assert_eq!(repo.log().len(), 1);
    assert!(repo.log()[0].ends_with("add app"));
    assert_eq!(repo.branches().iter().filter(|b| b.is_current).count(), 1);
}

#[tokio::test]
async fn test_refresh_reports_all_three_categories() {
    let (_temp, repo_path) = scratch_repo();
    commit_file(&repo_path, "tracked.txt", "original", "init");

    stage_file(&repo_path, "staged.txt", "staged");
    fs::write(repo_path.join("tracked.txt"), "modified").unwrap();
    fs::write(repo_path.join("untracked.txt"), "new").unwrap();

    let repo = Repository::new(&repo_path);
    repo.refresh().await.unwrap();

    let snapshot = repo.changes();
    assert_eq!(snapshot.staged.len(), 1);
    assert!(snapshot.staged[0].staged);
    assert_eq!(snapshot.unstaged.len(), 2);
    assert!(snapshot.parse_errors.is_empty());

    let states: Vec<&ChangeState> = snapshot.unstaged.iter().map(|c| &c.state).collect();
    assert!(states.contains(&&ChangeState::Modified));
    assert!(states.contains(&&ChangeState::Added));
}

#[tokio::test]
async fn test_readers_never_observe_partial_snapshot() {
    let (_temp, repo_path) = scratch_repo();
    fs::write(repo_path.join("a.txt"), "a").unwrap();
    fs::write(repo_path.join("b.txt"), "b").unwrap();
    fs::write(repo_path.join("c.txt"), "c").unwrap();

    let repo = Arc::new(Repository::new(&repo_path));

    // Poll the snapshot while a refresh runs; the fan-in barrier means a
    // reader sees the old view (empty) or the finished one (3), never a mix.
    let reader_repo = repo.clone();
    let reader = tokio::spawn(async move {
        for _ in 0..1000 {
            let seen = reader_repo.changes().unstaged.len();
            assert!(seen == 0 || seen == 3, "partial snapshot of {seen} entries");
            tokio::task::yield_now().await;
        }
    });

    repo.refresh().await.unwrap();
    reader.await.unwrap();

    assert_eq!(repo.changes().unstaged.len(), 3);
}

#[tokio::test]
async fn test_log_depth_setting_flows_through_facade() {
    let (_temp, repo_path) = scratch_repo();
    for i in 0..5 {
        commit_file(&repo_path, "file.txt", &format!("rev {i}"), &format!("commit {i}"));
    }

    let settings = Settings {
        max_log_depth: 2,
        ..Settings::default()
    };
    let repo = Repository::with_settings(&repo_path, settings);
    repo.refresh().await.unwrap();

    let log = repo.log();
    assert_eq!(log.len(), 2);
    assert!(log[0].ends_with("commit 4"));
}

#[tokio::test]
async fn test_branch_create_switch_and_history() {
    let (_temp, repo_path) = scratch_repo();
    commit_file(&repo_path, "base.txt", "base", "base commit");

    let repo = Repository::new(&repo_path);
    repo.refresh().await.unwrap();
    let original = repo
        .branches()
        .iter()
        .find(|b| b.is_current)
        .map(|b| b.name.clone())
        .expect("no current branch");

    repo.checkout_branch("topic", true).await.unwrap();
    assert!(repo
        .branches()
        .iter()
        .any(|b| b.name == "topic" && b.is_current));

    repo.checkout_branch(&original, false).await.unwrap();
    let branches = repo.branches();
    assert_eq!(branches.len(), 2);
    assert!(branches.iter().any(|b| b.name == original && b.is_current));
}

#[tokio::test]
async fn test_failed_commit_surfaces_exit_status() {
    let (_temp, repo_path) = scratch_repo();

    // A rejecting pre-commit hook makes the commit exit nonzero
    let hook_dir = repo_path.join(".git").join("hooks");
    fs::create_dir_all(&hook_dir).unwrap();
    let hook = hook_dir.join("pre-commit");
    fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
    }

    stage_file(&repo_path, "file.txt", "content");

    let repo = Repository::new(&repo_path);
    repo.refresh().await.unwrap();

    match repo.commit("will not land").await {
        Err(GitError::CommandFailed { exit_code, .. }) => assert_ne!(exit_code, 0),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_refreshes_serialize_cleanly() {
    let (_temp, repo_path) = scratch_repo();
    commit_file(&repo_path, "file.txt", "content", "init");
    fs::write(repo_path.join("extra.txt"), "extra").unwrap();

    let repo = Arc::new(Repository::new(&repo_path));

    let (a, b, c) = tokio::join!(
        {
            let repo = repo.clone();
            async move { repo.refresh().await }
        },
        {
            let repo = repo.clone();
            async move { repo.refresh().await }
        },
        {
            let repo = repo.clone();
            async move { repo.refresh().await }
        },
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(repo.changes().unstaged.len(), 1);
}
