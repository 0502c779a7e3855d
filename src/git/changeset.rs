use crate::error::{ParseError, Result};
use crate::git::change::Change;
use crate::process::{Invocation, LogChannel, ShellExecutor};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Atomically published view of the working tree, sorted by path
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub staged: Vec<Change>,
    pub unstaged: Vec<Change>,
    /// Lines that could not be parsed; kept for diagnostic display
    pub parse_errors: Vec<ParseError>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Reconciles the staged diff, working-tree diff, and untracked listing into
/// one consistent [`ChangeSet`] per refresh
///
/// The three sources are fetched concurrently into isolated buffers; the
/// snapshot is swapped in only once every source has finished, so a
/// concurrent reader sees the old view or the new one, never a mix.
#[derive(Debug)]
pub struct ChangeSetTracker {
    executor: ShellExecutor,
    snapshot: RwLock<Arc<ChangeSet>>,
}

impl ChangeSetTracker {
    pub fn new(executor: ShellExecutor) -> Self {
        Self {
            executor,
            snapshot: RwLock::new(Arc::new(ChangeSet::default())),
        }
    }

    /// Current published snapshot
    pub fn snapshot(&self) -> Arc<ChangeSet> {
        self.snapshot
            .read()
            .expect("changeset snapshot lock poisoned")
            .clone()
    }

    /// Rebuild the snapshot from the live repository
    pub async fn refresh(&self) -> Result<()> {
        // Cheap clean check; a quiet tree skips the heavier diff traffic.
        if self.is_clean().await? {
            self.publish(ChangeSet::default());
            return Ok(());
        }

        let staged = self.executor.git(&["diff", "--name-status", "--cached"])?;
        let working = self.executor.git(&["diff", "--name-status"])?;
        let untracked = self
            .executor
            .git(&["ls-files", "--others", "--exclude-standard"])?;

        // Await-all barrier: nothing is published until every stream has
        // delivered all of its lines and terminated.
        let ((staged, mut errors), (working, working_errors), (untracked, untracked_errors)) = tokio::try_join!(
            accumulate(staged, true, true, false),
            accumulate(working, true, false, true),
            accumulate(untracked, false, false, true),
        )?;

        errors.extend(working_errors);
        errors.extend(untracked_errors);

        let mut unstaged = working;
        unstaged.extend(untracked);

        self.publish(ChangeSet {
            staged,
            unstaged,
            parse_errors: errors,
        });
        Ok(())
    }

    /// A tree is clean when `status --porcelain` succeeds with no output
    async fn is_clean(&self) -> Result<bool> {
        let output = self
            .executor
            .git(&["status", "--porcelain"])?
            .collect()
            .await?;
        Ok(output.success && output.stdout_lines().next().is_none())
    }

    fn publish(&self, mut set: ChangeSet) {
        Change::sort(&mut set.staged);
        Change::sort(&mut set.unstaged);
        debug!(
            staged = set.staged.len(),
            unstaged = set.unstaged.len(),
            parse_errors = set.parse_errors.len(),
            "publishing change set"
        );
        *self
            .snapshot
            .write()
            .expect("changeset snapshot lock poisoned") = Arc::new(set);
    }
}

/// Drain one invocation into an isolated buffer of parsed changes
///
/// `filter_spaces` preserves the defensive guard the untracked and
/// working-diff streams carry against multi-field lines being misread as
/// single paths. Parse failures are recorded per line and never abort the
/// stream.
async fn accumulate(
    mut invocation: Invocation,
    tracked: bool,
    staged: bool,
    filter_spaces: bool,
) -> Result<(Vec<Change>, Vec<ParseError>)> {
    let mut changes = Vec::new();
    let mut errors = Vec::new();

    while let Some(line) = invocation.next_line().await {
        if line.channel != LogChannel::Stdout || line.text.is_empty() {
            continue;
        }
        if filter_spaces && line.text.contains(' ') {
            continue;
        }
        match Change::parse(&line.text, tracked, staged) {
            Ok(change) => changes.push(change),
            Err(e) => errors.push(e),
        }
    }

    // Nonzero exit from a diff is data, not a failure of the refresh.
    invocation.exit_status().await?;
    Ok((changes, errors))
}
