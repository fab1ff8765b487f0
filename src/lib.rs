//! PostgreSQL Backup Manager Library
//!
//! This library provides policy-driven backup orchestration wrapping
//! `pg_dump`, `pg_dumpall` and an external compressor.

pub mod config;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_policy, resolve_settings, ExclusionPolicy, Settings};
pub use managers::backup::{BackupError, BackupManager, DatabaseOutcome, RunReport, UnitError};
pub use managers::logging::{init_logging, LoggingConfig, LogGuard};
