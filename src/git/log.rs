use crate::error::Result;
use crate::process::{LogChannel, ShellExecutor};
use std::sync::{Arc, RwLock};

/// Single-stream accumulator for the commit log, capped client-side
///
/// The underlying command is not told to limit its output; lines beyond
/// `max_depth` are discarded as they arrive.
#[derive(Debug)]
pub struct LogTracker {
    executor: ShellExecutor,
    snapshot: RwLock<Arc<Vec<String>>>,
}

impl LogTracker {
    pub fn new(executor: ShellExecutor) -> Self {
        Self {
            executor,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current published log lines
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.snapshot
            .read()
            .expect("log snapshot lock poisoned")
            .clone()
    }

    /// Re-read the commit log, retaining at most `max_depth` lines
    pub async fn refresh(&self, max_depth: usize) -> Result<()> {
        let mut invocation = self
            .executor
            .git(&["log", "--pretty=oneline", "--abbrev-commit"])?;

        let mut lines = Vec::new();
        while let Some(line) = invocation.next_line().await {
            if line.channel != LogChannel::Stdout {
                continue;
            }
            if lines.len() < max_depth {
                lines.push(line.text);
            }
            // Past the cap the stream is still drained so the child can exit.
        }
        // Nonzero exit (no commits yet) publishes whatever accumulated: nothing.
        invocation.exit_status().await?;

        *self.snapshot.write().expect("log snapshot lock poisoned") = Arc::new(lines);
        Ok(())
    }
}
