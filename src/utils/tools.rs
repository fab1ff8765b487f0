//! Locating the PostgreSQL client tools and the compressor on PATH

use crate::config::{CompressorKind, ConfigError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PSQL: &str = "psql";
pub const PG_DUMP: &str = "pg_dump";
pub const PG_DUMPALL: &str = "pg_dumpall";

/// Absolute paths of every external program a run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub psql: PathBuf,
    pub pg_dump: PathBuf,
    pub pg_dumpall: PathBuf,
    pub compressor: PathBuf,
}

impl ToolPaths {
    /// Resolve all tools against the process PATH
    pub fn resolve(compressor: CompressorKind) -> Result<Self, ConfigError> {
        Self::resolve_with(compressor, |name| which::which(name))
    }

    /// Resolve all tools against an explicit search path
    pub fn resolve_in<P: AsRef<OsStr>>(
        compressor: CompressorKind,
        search_path: P,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(compressor, |name| {
            which::which_in(name, Some(search_path.as_ref()), cwd)
        })
    }

    fn resolve_with<F>(compressor: CompressorKind, find: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> which::Result<PathBuf>,
    {
        let locate = |name: &str| {
            let path = find(name).map_err(|source| ConfigError::ToolNotFound {
                tool: name.to_string(),
                source,
            })?;
            debug!("Found {} at {}", name, path.display());
            Ok::<_, ConfigError>(path)
        };

        // Compressor first, it is the tool most likely to be missing
        let compressor = locate(compressor.binary_name())?;

        Ok(Self {
            psql: locate(PSQL)?,
            pg_dump: locate(PG_DUMP)?,
            pg_dumpall: locate(PG_DUMPALL)?,
            compressor,
        })
    }
}
