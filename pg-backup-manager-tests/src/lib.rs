//! Test utilities for pg-backup-manager
//!
//! This crate provides shared test utilities, fixtures and helper
//! functions for testing the pg-backup-manager application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{sample_manager, MockExecutor, PolicyBuilder};
//!
//! #[test]
//! fn my_test() {
//!     let policy = PolicyBuilder::new().disable("template0").build();
//!     let executor = MockExecutor::new().with_databases(&["template0", "appdb"]);
//!     let manager = sample_manager(policy, executor);
//!     // ... test code
//! }
//! ```

pub mod fixtures;
pub mod policy_builder;
pub mod test_context;

// Re-export commonly used items
pub use fixtures::*;
pub use policy_builder::PolicyBuilder;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use pg_backup_manager::config::{
    CompressionLevel, CompressorKind, CompressorSelection, ConnectionProfile, ExclusionPolicy,
    Password, Settings, SettingsFile, SettingsOverrides,
};
pub use pg_backup_manager::utils::{BackupCommand, BackupTarget, ToolPaths};

// Re-export mock implementations from the main crate
pub use pg_backup_manager::utils::executor::mock::{MockExecutor, MockResponse, RecordedCall};
pub use pg_backup_manager::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
