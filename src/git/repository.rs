use crate::audit::MutationLog;
use crate::config::Settings;
use crate::error::{GitError, Result};
use crate::git::branches::{Branch, BranchTracker};
use crate::git::change::{Change, ChangeState};
use crate::git::changeset::{ChangeSet, ChangeSetTracker};
use crate::git::log::LogTracker;
use crate::process::ShellExecutor;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Single entry point for the host: snapshots to read, mutations to issue
///
/// Mutating commands and refreshes are serialized behind one async mutex, so
/// a mutation never races a refresh of the same working tree. Every mutation
/// triggers a fresh refresh before returning.
pub struct Repository {
    path: PathBuf,
    executor: ShellExecutor,
    settings: Settings,
    changes: ChangeSetTracker,
    branches: BranchTracker,
    log: LogTracker,
    audit: Option<MutationLog>,
    write_lock: Mutex<()>,
}

impl Repository {
    /// Detect git repository from current working directory
    pub fn discover() -> Result<Self> {
        let current_dir = env::current_dir()?;
        Self::discover_from(&current_dir)
    }

    /// Detect git repository starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> Result<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Ok(Self::new(current));
            }
            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Create a Repository for a known git directory, with default settings
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_settings(path, Settings::default())
    }

    /// Create a Repository with explicit settings
    pub fn with_settings<P: AsRef<Path>>(path: P, settings: Settings) -> Self {
        let path = path.as_ref().to_path_buf();

        let mut executor = ShellExecutor::new(&path);
        if let Some(secs) = settings.command_timeout_secs {
            executor = executor.with_timeout(Duration::from_secs(secs));
        }

        Self {
            changes: ChangeSetTracker::new(executor.clone()),
            branches: BranchTracker::new(executor.clone()),
            log: LogTracker::new(executor.clone()),
            // Missing HOME just disables the mutation history
            audit: MutationLog::for_repo(&path).ok(),
            write_lock: Mutex::new(()),
            executor,
            settings,
            path,
        }
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Rebuild all snapshots from the live repository
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<()> {
        tokio::try_join!(
            self.changes.refresh(),
            self.branches.refresh(),
            self.log.refresh(self.settings.max_log_depth),
        )?;
        Ok(())
    }

    /// Latest published change set
    pub fn changes(&self) -> Arc<ChangeSet> {
        self.changes.snapshot()
    }

    /// Latest published local branch list
    pub fn branches(&self) -> Arc<Vec<Branch>> {
        self.branches.snapshot()
    }

    /// Latest published commit-log lines
    pub fn log(&self) -> Arc<Vec<String>> {
        self.log.snapshot()
    }

    /// Record `change` in the index; no-op if it already is
    pub async fn stage(&self, change: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.stage_one(change).await?;
        self.refresh_locked().await
    }

    /// Remove `change` from the index; a rename releases both paths
    pub async fn unstage(&self, change: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.unstage_one(change).await?;
        self.refresh_locked().await
    }

    /// Discard the local modification carried by `change`
    ///
    /// Untracked additions are deleted only when the settings authorize it;
    /// tracked content is restored from the last committed revision.
    pub async fn revert(&self, change: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.revert_one(change).await?;
        self.refresh_locked().await
    }

    /// Stage every record in `selection`, or `designated` when it is empty
    pub async fn stage_selected(&self, selection: &[Change], designated: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let applied = if selection.is_empty() {
            self.stage_one(designated).await
        } else {
            let mut applied = Ok(());
            for change in selection {
                applied = self.stage_one(change).await;
                if applied.is_err() {
                    break;
                }
            }
            applied
        };
        // Changes applied before a failure must still reach the snapshot.
        let refreshed = self.refresh_locked().await;
        applied.and(refreshed)
    }

    /// Unstage every record in `selection`, or `designated` when it is empty
    pub async fn unstage_selected(&self, selection: &[Change], designated: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let applied = if selection.is_empty() {
            self.unstage_one(designated).await
        } else {
            let mut applied = Ok(());
            for change in selection {
                applied = self.unstage_one(change).await;
                if applied.is_err() {
                    break;
                }
            }
            applied
        };
        let refreshed = self.refresh_locked().await;
        applied.and(refreshed)
    }

    /// Revert every record in `selection`, or `designated` when it is empty
    pub async fn revert_selected(&self, selection: &[Change], designated: &Change) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let applied = if selection.is_empty() {
            self.revert_one(designated).await
        } else {
            let mut applied = Ok(());
            for change in selection {
                applied = self.revert_one(change).await;
                if applied.is_err() {
                    break;
                }
            }
            applied
        };
        let refreshed = self.refresh_locked().await;
        applied.and(refreshed)
    }

    /// Commit the staged set
    ///
    /// Returns `Ok(false)` without issuing anything when the message is empty
    /// or nothing is staged. Embedded double quotes are sanitized to spaces.
    /// A nonzero exit surfaces as [`GitError::CommandFailed`].
    pub async fn commit(&self, message: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let message = message.trim();
        if message.is_empty() || self.changes.snapshot().staged.is_empty() {
            return Ok(false);
        }

        let sanitized = message.replace('"', " ");
        self.run_mutation(&["commit", "-m", &sanitized]).await?;
        self.refresh_locked().await?;
        Ok(true)
    }

    /// Switch to `name`, creating the branch first when `create_new` is set
    pub async fn checkout_branch(&self, name: &str, create_new: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if create_new {
            self.run_mutation(&["checkout", "-b", name]).await?;
        } else {
            self.run_mutation(&["checkout", name]).await?;
        }
        self.refresh_locked().await
    }

    async fn stage_one(&self, change: &Change) -> Result<()> {
        if change.staged {
            return Ok(());
        }
        self.run_mutation(&["add", &change.path]).await
    }

    async fn unstage_one(&self, change: &Change) -> Result<()> {
        if !change.staged {
            return Ok(());
        }
        // A rename occupies two index entries; release the original first.
        if let Some(original) = change.original_path() {
            self.run_mutation(&["reset", "HEAD", original]).await?;
        }
        self.run_mutation(&["reset", "HEAD", &change.path]).await
    }

    async fn revert_one(&self, change: &Change) -> Result<()> {
        match change.state {
            ChangeState::Added => {
                if self.settings.delete_untracked_on_revert {
                    debug!(path = %change.path, "deleting untracked file on revert");
                    tokio::fs::remove_file(self.path.join(&change.path)).await?;
                    if let Some(audit) = &self.audit {
                        if let Err(e) = audit.record_deletion(&change.path) {
                            warn!(error = %e, "failed to write history entry");
                        }
                    }
                }
                Ok(())
            }
            _ => {
                self.run_mutation(&["checkout", "HEAD", "--", &change.path])
                    .await
            }
        }
    }

    /// Run one mutating command, record it, and surface a nonzero exit
    async fn run_mutation(&self, args: &[&str]) -> Result<()> {
        let output = self.executor.git(args)?.collect().await?;

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record_command(&output.command, output.exit_code) {
                warn!(error = %e, "failed to write history entry");
            }
        }

        if !output.success {
            let stderr = output.stderr();
            return Err(GitError::CommandFailed {
                command: output.command,
                exit_code: output.exit_code,
                stderr,
            });
        }
        Ok(())
    }
}
