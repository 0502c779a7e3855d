use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotate once the history file grows past this many bytes
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;

/// Append-only history of the mutations applied to one repository
///
/// Two kinds of entries exist: git commands issued by the facade, recorded
/// with their exit code, and direct file deletions performed when an
/// untracked file is reverted (those never go through git).
pub struct MutationLog {
    repo: PathBuf,
    log_path: PathBuf,
}

impl MutationLog {
    /// Log mutations of `repo` to the shared default history file,
    /// ~/.config/gitpane/history.log
    pub fn for_repo(repo: &Path) -> std::io::Result<Self> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;
        let log_path = PathBuf::from(home)
            .join(".config")
            .join("gitpane")
            .join("history.log");
        Self::at_path(repo, log_path)
    }

    /// Log mutations of `repo` to an explicit file
    pub fn at_path<P: AsRef<Path>>(repo: &Path, log_path: P) -> std::io::Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            repo: repo.to_path_buf(),
            log_path,
        })
    }

    /// Record a git command and the exit code it finished with
    pub fn record_command(&self, command: &str, exit_code: i32) -> std::io::Result<()> {
        self.append(&format!("exit:{exit_code} {command}"))
    }

    /// Record the direct deletion of an untracked file during a revert
    pub fn record_deletion(&self, path: &str) -> std::io::Result<()> {
        self.append(&format!("deleted {path}"))
    }

    /// The file entries are appended to
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        self.rotate_full_log()?;

        let line = format!(
            "{} {} {}\n",
            Utc::now().to_rfc3339(),
            self.repo.display(),
            entry
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    fn rotate_full_log(&self) -> std::io::Result<()> {
        match fs::metadata(&self.log_path) {
            Ok(meta) if meta.len() > ROTATE_AT_BYTES => {
                fs::rename(&self.log_path, self.log_path.with_extension("log.old"))
            }
            _ => Ok(()),
        }
    }
}
