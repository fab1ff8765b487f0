pub mod command;
pub mod pipeline;
pub mod tools;

// Trait-based abstraction for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use command::{ProcessError, QueryOutput};
pub use executor::{CommandExecutor, RealExecutor};
pub use pipeline::{ArchiveSink, BackupCommand, BackupTarget, CommandSpec, PipelineBuilder, PipelineError};
pub use tools::ToolPaths;
