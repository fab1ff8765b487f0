//! Test context and harness for integration testing
//!
//! Provides a unified context for setting up and tearing down test environments.

use crate::fixtures::{self, SAMPLE_PASSWORD};
use crate::policy_builder::PolicyBuilder;
use anyhow::Result;
use pg_backup_manager::config::{self, Settings, SettingsOverrides};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Where archives are written in this context; not created up front
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backups")
    }

    /// Where log files are written in this context
    pub fn log_dir(&self) -> PathBuf {
        self.temp_dir.path().join("logs")
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Create a password file with the given content
    pub fn create_password_file(&self, password: &str) -> PathBuf {
        self.create_file("pgpass", password)
    }

    /// Write a policy document and return its path
    pub fn write_policy(&self, builder: &PolicyBuilder) -> PathBuf {
        builder.write_to(self.temp_dir.path())
    }

    /// Write a settings file from a template in [`fixtures`]
    ///
    /// `{host}`, `{output}`, `{password_file}`, `{json_file}` and
    /// `{log_directory}` are filled in with paths inside this context.
    pub fn write_settings(&self, template: &str) -> PathBuf {
        let password_file = self.create_password_file(&format!("{}\n", SAMPLE_PASSWORD));
        let json_file = self.write_policy(&PolicyBuilder::templates_disabled());

        let contents = template
            .replace("{host}", "db.test")
            .replace("{output}", &self.output_dir().display().to_string())
            .replace("{password_file}", &password_file.display().to_string())
            .replace("{json_file}", &json_file.display().to_string())
            .replace("{log_directory}", &self.log_dir().display().to_string());

        self.create_file("settings.toml", &contents)
    }

    /// Resolve settings for this context from command line overrides only
    pub fn resolve(&self, overrides: SettingsOverrides) -> Result<Settings> {
        Ok(config::resolve_settings(overrides, None)?)
    }

    /// Sample settings writing into this context's output directory
    pub fn sample_settings(&self) -> Settings {
        fixtures::sample_settings(&self.output_dir())
    }

    /// Check if a file exists in the temp directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
