//! Fluent API for building exclusion policy documents
//!
//! Produces either a parsed [`ExclusionPolicy`] or the JSON text a policy
//! file would contain, so tests can exercise both the loader and the manager.

use pg_backup_manager::config::{
    DatabaseEntry, ExclusionPolicy, PolicyDocument, SchemaEntry, DISABLED_STATE,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Builder for creating test policy documents
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    document: PolicyDocument,
}

impl PolicyBuilder {
    /// Create an empty policy: every database is backed up in full
    pub fn new() -> Self {
        Self::default()
    }

    /// The policy shipped next to the binary: template databases are skipped
    pub fn templates_disabled() -> Self {
        Self::new().disable("template0").disable("template1")
    }

    /// Add a disabled database
    pub fn disable(mut self, name: &str) -> Self {
        self.document.database.push(DatabaseEntry {
            name: name.to_string(),
            state: Some(DISABLED_STATE.to_string()),
            schema: vec![],
        });
        self
    }

    /// Add an enabled database with the given schemas excluded
    pub fn exclude_schemas(mut self, name: &str, schemas: &[&str]) -> Self {
        self.document.database.push(DatabaseEntry {
            name: name.to_string(),
            state: Some("enabled".to_string()),
            schema: schemas
                .iter()
                .map(|schema| SchemaEntry {
                    name: schema.to_string(),
                    state: Some("excluded".to_string()),
                })
                .collect(),
        });
        self
    }

    /// Add a raw entry, for documents the helpers above cannot express
    pub fn add_entry(mut self, entry: DatabaseEntry) -> Self {
        self.document.database.push(entry);
        self
    }

    /// Build the parsed policy
    pub fn build(self) -> ExclusionPolicy {
        ExclusionPolicy::from_document(self.document)
    }

    /// Render the document as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.document).expect("Failed to serialize policy")
    }

    /// Write the document to `dir/pg_db.json` and return its path
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("pg_db.json");
        fs::write(&path, self.to_json()).expect("Failed to write policy file");
        path
    }
}
