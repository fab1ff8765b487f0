//! Exclusion policy
//!
//! The policy document lists databases that must not be dumped and, per
//! database, schemas to leave out of the dump:
//!
//! ```json
//! {
//!   "database": [
//!     { "name": "template0", "state": "disabled", "schema": [] },
//!     { "name": "appdb", "state": "enabled",
//!       "schema": [ { "name": "audit", "state": "excluded" } ] }
//!   ]
//! }
//! ```
//!
//! Databases missing from the document are backed up with no exclusions.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::warn;

/// State value that disables a database
pub const DISABLED_STATE: &str = "disabled";

/// Raw policy document as stored on disk
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyDocument {
    pub database: Vec<DatabaseEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseEntry {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub schema: Vec<SchemaEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaEntry {
    pub name: String,
    /// Parsed but not consulted: every listed schema is excluded
    #[serde(default)]
    pub state: Option<String>,
}

/// Policy for a single database, after load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub enabled: bool,
    pub excluded_schemas: Vec<String>,
}

impl From<DatabaseEntry> for PolicyRecord {
    fn from(entry: DatabaseEntry) -> Self {
        Self {
            enabled: entry.state.as_deref() != Some(DISABLED_STATE),
            excluded_schemas: entry.schema.into_iter().map(|s| s.name).collect(),
        }
    }
}

/// Read-only lookup table built once from a [`PolicyDocument`]
///
/// When a database name appears more than once in the document the first
/// entry wins and later ones are ignored. The ignored names are kept so they
/// can be reported once logging is up.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    records: HashMap<String, PolicyRecord>,
    duplicates: Vec<String>,
}

impl ExclusionPolicy {
    pub fn from_document(document: PolicyDocument) -> Self {
        let mut records = HashMap::with_capacity(document.database.len());
        let mut duplicates = Vec::new();

        for entry in document.database {
            match records.entry(entry.name.clone()) {
                Entry::Occupied(_) => duplicates.push(entry.name),
                Entry::Vacant(slot) => {
                    slot.insert(PolicyRecord::from(entry));
                }
            }
        }

        Self {
            records,
            duplicates,
        }
    }

    /// Names whose later entries were ignored, once per ignored entry
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Warn about every ignored duplicate entry
    pub fn warn_duplicates(&self) {
        for name in &self.duplicates {
            warn!(
                "Duplicate policy entry for database '{}' ignored, first entry wins",
                name
            );
        }
    }

    /// Parse a policy document from JSON text
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let document: PolicyDocument = serde_json::from_str(contents)?;
        Ok(Self::from_document(document))
    }

    /// False only when the database has an entry whose state is exactly "disabled"
    pub fn is_database_enabled(&self, name: &str) -> bool {
        self.records.get(name).map_or(true, |record| record.enabled)
    }

    /// Schemas to exclude from the dump of `name`, in document order
    pub fn excluded_schemas(&self, name: &str) -> &[String] {
        self.records
            .get(name)
            .map(|record| record.excluded_schemas.as_slice())
            .unwrap_or(&[])
    }

    pub fn record(&self, name: &str) -> Option<&PolicyRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
