use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run a git command in `repo`, panicking if it cannot run or exits nonzero
pub fn git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("git is not runnable");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Fresh throwaway repository with a test identity configured
pub fn scratch_repo() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_path_buf();
    git(&path, &["init"]);
    git(&path, &["config", "user.name", "gitpane tests"]);
    git(&path, &["config", "user.email", "gitpane@tests.invalid"]);
    (dir, path)
}

/// Write `file` and commit it
pub fn commit_file(repo: &Path, file: &str, content: &str, message: &str) {
    fs::write(repo.join(file), content).unwrap();
    git(repo, &["add", file]);
    git(repo, &["commit", "-m", message]);
}

/// Write `file` and stage it without committing
pub fn stage_file(repo: &Path, file: &str, content: &str) {
    fs::write(repo.join(file), content).unwrap();
    git(repo, &["add", file]);
}
