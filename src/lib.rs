pub mod audit;
pub mod config;
pub mod error;
pub mod git;
pub mod process;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use error::{GitError, ParseError, Result};
pub use git::{Branch, Change, ChangeSet, ChangeState, Repository};
pub use process::{Invocation, InvocationOutput, LogChannel, LogLine, ShellExecutor};
