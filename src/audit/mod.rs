pub mod logger;

pub use logger::MutationLog;
