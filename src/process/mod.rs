pub mod executor;

// Re-export commonly used types
pub use executor::{Invocation, InvocationOutput, LogChannel, LogLine, ShellExecutor};
