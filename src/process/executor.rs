use crate::error::{GitError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Which pipe a line of output arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    Stdout,
    Stderr,
}

/// One line of process output, tagged by channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub channel: LogChannel,
    pub text: String,
}

/// Fully collected result of one invocation
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    pub command: String,
    pub logs: Vec<LogLine>,
    pub exit_code: i32,
    pub success: bool,
}

impl InvocationOutput {
    /// Iterate over stdout lines in arrival order
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.logs
            .iter()
            .filter(|l| l.channel == LogChannel::Stdout)
            .map(|l| l.text.as_str())
    }

    /// All stderr output joined with newlines
    pub fn stderr(&self) -> String {
        self.logs
            .iter()
            .filter(|l| l.channel == LogChannel::Stderr)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Spawns external commands and streams their output without blocking the caller
///
/// Each call to [`ShellExecutor::run`] produces an independent [`Invocation`];
/// any number of them can be in flight at once.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ShellExecutor {
    /// Create an executor that runs commands inside `working_dir`
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    /// Apply a per-invocation timeout to `collect`/`exit_status`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the directory commands run in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Shorthand for running the git binary
    pub fn git(&self, args: &[&str]) -> Result<Invocation> {
        self.run("git", args)
    }

    /// Spawn `program` with `args` and return a handle to its streamed output
    ///
    /// A spawn failure (missing binary, permission denied) is reported here as
    /// [`GitError::SpawnFailed`]; a process that starts and exits nonzero is
    /// not an error at this layer.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<Invocation> {
        let command = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GitError::SpawnFailed {
                command: command.clone(),
                source,
            })?;

        debug!(command = %command, "spawned process");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::Io(io::Error::other("child stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GitError::Io(io::Error::other("child stderr was not captured")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let out_task = tokio::spawn(forward_lines(stdout, LogChannel::Stdout, tx.clone()));
        let err_task = tokio::spawn(forward_lines(stderr, LogChannel::Stderr, tx));

        let driver_command = command.clone();
        let driver = tokio::spawn(async move {
            // Both readers must drain before the exit status is reported, so
            // every line is observable ahead of completion.
            let _ = out_task.await;
            let _ = err_task.await;

            let status = child.wait().await?;
            let exit_code = status.code().unwrap_or(-1);
            debug!(command = %driver_command, exit_code, "process exited");
            Ok(exit_code)
        });

        Ok(Invocation {
            command,
            lines: rx,
            driver,
            timeout: self.timeout,
        })
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(
    reader: R,
    channel: LogChannel,
    tx: mpsc::UnboundedSender<LogLine>,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                // Receiver may be gone; keep draining so the child never
                // blocks on a full pipe.
                let _ = tx.send(LogLine { channel, text });
            }
            Ok(None) => break,
            Err(e) => {
                warn!(?channel, error = %e, "output stream read failed, truncating");
                break;
            }
        }
    }
}

/// One run of an external command
///
/// Output lines arrive in emission order via [`Invocation::next_line`]; the
/// stream ends (`None`) strictly before [`Invocation::exit_status`] resolves.
/// Dropping an invocation cancels it and kills the child process.
#[derive(Debug)]
pub struct Invocation {
    command: String,
    lines: mpsc::UnboundedReceiver<LogLine>,
    driver: JoinHandle<Result<i32>>,
    timeout: Option<Duration>,
}

impl Invocation {
    /// The command line this invocation is running
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Receive the next output line; `None` once all output has been delivered
    pub async fn next_line(&mut self) -> Option<LogLine> {
        self.lines.recv().await
    }

    /// Kill the underlying process and discard undelivered output
    pub fn cancel(&mut self) {
        self.driver.abort();
        self.lines.close();
    }

    /// Wait for termination and resolve the raw exit code
    ///
    /// Unread lines are drained first; nonzero exit codes are returned as
    /// data, not as errors.
    pub async fn exit_status(self) -> Result<i32> {
        Ok(self.collect().await?.exit_code)
    }

    /// Drive the invocation to completion and collect all of its output
    pub async fn collect(mut self) -> Result<InvocationOutput> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.gather()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(command = %self.command, "invocation timed out");
                    self.cancel();
                    Err(GitError::Timeout {
                        command: self.command.clone(),
                    })
                }
            },
            None => self.gather().await,
        }
    }

    async fn gather(&mut self) -> Result<InvocationOutput> {
        let mut logs = Vec::new();
        while let Some(line) = self.lines.recv().await {
            logs.push(line);
        }

        let exit_code = match (&mut self.driver).await {
            Ok(result) => result?,
            Err(join) if join.is_cancelled() => return Err(GitError::Cancelled),
            Err(join) => return Err(GitError::Io(io::Error::other(join))),
        };

        Ok(InvocationOutput {
            command: self.command.clone(),
            logs,
            exit_code,
            success: exit_code == 0,
        })
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        // kill_on_drop reaps the child once the driver task is gone
        self.driver.abort();
    }
}
