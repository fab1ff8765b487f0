//! Configuration module for pg-backup-manager
//!
//! This module resolves startup settings and loads the exclusion policy.
//!
//! ## Settings Precedence
//!
//! Settings are applied in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. TOML settings file (if `--config` is given)
//! 3. Command line flags and their environment variables
//!
//! ## Example Usage
//!
//! ```no_run
//! use pg_backup_manager::config;
//!
//! let policy = config::load_policy("pg_db.json")?;
//!
//! if policy.is_database_enabled("appdb") {
//!     println!("Excluded schemas: {:?}", policy.excluded_schemas("appdb"));
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod policy;
mod types;

pub use loader::{load_policy, load_settings_file, resolve_settings, ConfigError, Result};
pub use policy::{DatabaseEntry, ExclusionPolicy, PolicyDocument, PolicyRecord, SchemaEntry, DISABLED_STATE};
pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};

/// Create the output directory and, if configured, the log directory
///
/// Runs once at startup, before any backup attempt.
pub fn prepare_directories(settings: &Settings) -> Result<()> {
    create_directory(&settings.output_directory)?;

    if let Some(ref log_dir) = settings.log_directory {
        create_directory(log_dir)?;
    }

    Ok(())
}

fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| ConfigError::DirectoryError {
        path: path.to_path_buf(),
        source,
    })
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
