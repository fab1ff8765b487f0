//! Test fixtures and sample data
//!
//! Provides pre-built settings, tool paths and managers for testing.

use pg_backup_manager::config::{
    CompressionLevel, CompressorKind, CompressorSelection, ConnectionProfile, ExclusionPolicy,
    Password, Settings,
};
use pg_backup_manager::utils::executor::mock::MockExecutor;
use pg_backup_manager::utils::ToolPaths;
use pg_backup_manager::BackupManager;
use std::path::{Path, PathBuf};

/// Password used by every sample
pub const SAMPLE_PASSWORD: &str = "test-password-123";

/// Output directory used when a test does not care where archives land
pub const SAMPLE_OUTPUT: &str = "/var/backups/pg";

/// Create a sample connection profile
pub fn sample_profile() -> ConnectionProfile {
    ConnectionProfile {
        host: "db.test".to_string(),
        port: 5432,
        user: "postgres".to_string(),
        database: "postgres".to_string(),
    }
}

/// Tool paths under `/usr/bin`, nothing is resolved on disk
pub fn sample_tools(compressor: CompressorKind) -> ToolPaths {
    let bin = Path::new("/usr/bin");
    ToolPaths {
        psql: bin.join("psql"),
        pg_dump: bin.join("pg_dump"),
        pg_dumpall: bin.join("pg_dumpall"),
        compressor: bin.join(compressor.binary_name()),
    }
}

/// Compressor selection with a level that must be valid
pub fn selection(kind: CompressorKind, level: i64) -> CompressorSelection {
    CompressorSelection {
        kind,
        level: CompressionLevel::new(level).expect("level out of range in fixture"),
    }
}

/// Settings for a gzip run at level 9 into `output`
pub fn sample_settings(output: &Path) -> Settings {
    Settings {
        connection: sample_profile(),
        password: Password::new(SAMPLE_PASSWORD),
        output_directory: output.to_path_buf(),
        compressor: selection(CompressorKind::Gzip, 9),
        policy_file: PathBuf::from("pg_db.json"),
        log_directory: None,
        log_level: "info".to_string(),
    }
}

/// Manager wired to a mock executor with sample settings and gzip
pub fn sample_manager(policy: ExclusionPolicy, executor: MockExecutor) -> BackupManager<MockExecutor> {
    manager_with(
        &sample_settings(Path::new(SAMPLE_OUTPUT)),
        policy,
        executor,
    )
}

/// Manager wired to a mock executor with the given settings
pub fn manager_with(
    settings: &Settings,
    policy: ExclusionPolicy,
    executor: MockExecutor,
) -> BackupManager<MockExecutor> {
    BackupManager::new(
        settings,
        sample_tools(settings.compressor.kind),
        policy,
        executor,
    )
}

/// Listing output as `psql -A -q -t` prints it
pub fn listing_output(names: &[&str]) -> String {
    names.iter().map(|name| format!("{}\n", name)).collect()
}

/// A typical fresh cluster plus two application databases
pub fn cluster_databases() -> Vec<&'static str> {
    vec!["postgres", "template0", "template1", "appdb", "analytics"]
}

/// Minimal settings file template
pub fn minimal_settings_toml() -> &'static str {
    r#"
host = "{host}"
output = "{output}"
password_file = "{password_file}"
"#
}

/// Settings file using every key
pub fn full_settings_toml() -> &'static str {
    r#"
host = "{host}"
port = 6432
user = "backup"
database = "maintenance"
password_file = "{password_file}"
output = "{output}"
compressor = "xz"
level = 6
json_file = "{json_file}"
log_directory = "{log_directory}"
log_level = "debug"
"#
}
