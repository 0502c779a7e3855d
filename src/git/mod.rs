pub mod branches;
pub mod change;
pub mod changeset;
pub mod log;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use branches::{Branch, BranchTracker};
pub use change::{Change, ChangeState};
pub use changeset::{ChangeSet, ChangeSetTracker};
pub use log::LogTracker;
pub use repository::Repository;
