use crate::error::Result;
use crate::process::{LogChannel, ShellExecutor};
use std::sync::{Arc, RwLock};

/// One local branch from `git branch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub is_current: bool,
}

/// Single-stream accumulator for the local branch list
#[derive(Debug)]
pub struct BranchTracker {
    executor: ShellExecutor,
    snapshot: RwLock<Arc<Vec<Branch>>>,
}

impl BranchTracker {
    pub fn new(executor: ShellExecutor) -> Self {
        Self {
            executor,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current published branch list
    pub fn snapshot(&self) -> Arc<Vec<Branch>> {
        self.snapshot
            .read()
            .expect("branch snapshot lock poisoned")
            .clone()
    }

    /// Re-list local branches and publish once the invocation completes
    pub async fn refresh(&self) -> Result<()> {
        let mut invocation = self.executor.git(&["branch"])?;

        let mut branches = Vec::new();
        while let Some(line) = invocation.next_line().await {
            if line.channel != LogChannel::Stdout || line.text.is_empty() {
                continue;
            }
            // A leading "* " marks the checked-out branch
            let is_current = line.text.starts_with('*');
            let name = line.text.trim_start_matches('*').trim().to_string();
            if name.is_empty() {
                continue;
            }
            branches.push(Branch { name, is_current });
        }
        invocation.exit_status().await?;

        *self
            .snapshot
            .write()
            .expect("branch snapshot lock poisoned") = Arc::new(branches);
        Ok(())
    }
}
