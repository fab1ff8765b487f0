//! Backup manager - orchestrates a backup run
//!
//! A run lists the databases on the server, dumps each one the exclusion
//! policy allows, then always dumps the globals. Databases are processed one
//! at a time, in the order the server lists them, and one database failing
//! never stops the others or the globals.

use crate::config::{ExclusionPolicy, Settings};
use crate::utils::executor::CommandExecutor;
use crate::utils::pipeline::{BackupCommand, PipelineBuilder, PipelineError};
use crate::utils::tools::ToolPaths;
use crate::utils::ProcessError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Failure of the run as a whole
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("failed to list databases: {0}")]
    Listing(#[source] ProcessError),
}

/// Failure of a single database or of the globals
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug)]
pub enum DatabaseOutcome {
    Succeeded { archive: PathBuf },
    SkippedDisabled,
    Failed(UnitError),
}

#[derive(Debug)]
pub struct DatabaseReport {
    pub name: String,
    pub outcome: DatabaseOutcome,
}

/// Outcome of every unit of work in a completed run
#[derive(Debug)]
pub struct RunReport {
    pub databases: Vec<DatabaseReport>,
    pub globals: Result<PathBuf, UnitError>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, DatabaseOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DatabaseOutcome::SkippedDisabled))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DatabaseOutcome::Failed(_)))
    }

    /// True when any database or the globals failed
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.globals.is_err()
    }

    pub fn outcome(&self, name: &str) -> Option<&DatabaseOutcome> {
        self.databases
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.outcome)
    }

    fn count(&self, predicate: impl Fn(&DatabaseOutcome) -> bool) -> usize {
        self.databases
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

pub struct BackupManager<E: CommandExecutor> {
    builder: PipelineBuilder,
    policy: ExclusionPolicy,
    executor: E,
    server: String,
}

impl<E: CommandExecutor> BackupManager<E> {
    /// Create new backup manager
    pub fn new(settings: &Settings, tools: ToolPaths, policy: ExclusionPolicy, executor: E) -> Self {
        let builder = PipelineBuilder::new(
            settings.connection.clone(),
            settings.compressor,
            tools,
            settings.output_directory.clone(),
        );

        Self {
            builder,
            policy,
            executor,
            server: format!("{}:{}", settings.connection.host, settings.connection.port),
        }
    }

    /// Run a full backup: every enabled database, then the globals
    pub fn run(&self) -> Result<RunReport, BackupError> {
        let start_time = Instant::now();
        info!("Starting backup run for {}", self.server);

        let databases = self.list_databases()?;

        let mut reports = Vec::with_capacity(databases.len());
        for listed in databases {
            let report = match listed {
                Ok(name) => {
                    let outcome = self.backup_database(&name);
                    DatabaseReport { name, outcome }
                }
                Err(e) => {
                    error!("Failed to back up database: {}", e);
                    DatabaseReport {
                        name: e.name().to_string(),
                        outcome: DatabaseOutcome::Failed(e.into()),
                    }
                }
            };
            reports.push(report);
        }

        // Always attempted, whatever happened above
        let globals = self.backup_globals();

        let report = RunReport {
            databases: reports,
            globals,
            elapsed: start_time.elapsed(),
        };

        info!(
            "Backup run finished in {:.2}s: {} succeeded, {} skipped, {} failed, globals {}",
            report.elapsed.as_secs_f64(),
            report.succeeded(),
            report.skipped(),
            report.failed(),
            if report.globals.is_ok() { "succeeded" } else { "failed" }
        );

        Ok(report)
    }

    /// List and filter like a real run, returning the commands that would run
    ///
    /// Only the listing query is executed.
    pub fn dry_run(&self) -> Result<Vec<BackupCommand>, BackupError> {
        info!("Starting dry run for {}", self.server);

        let mut commands = Vec::new();
        for listed in self.list_databases()? {
            let name = match listed {
                Ok(name) => name,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            if !self.policy.is_database_enabled(&name) {
                info!("Database '{}' is disabled in policy, would skip", name);
                continue;
            }

            match self.builder.database_dump(&name, self.policy.excluded_schemas(&name)) {
                Ok(command) => {
                    info!("Would run: {}", command);
                    commands.push(command);
                }
                Err(e) => warn!("{}", e),
            }
        }

        let globals = self.builder.globals_dump();
        info!("Would run: {}", globals);
        commands.push(globals);

        Ok(commands)
    }

    /// Enumerate database names, one per non-empty output line
    ///
    /// A name that is not valid UTF-8 cannot be passed on unchanged, so it is
    /// returned as an error for that database alone.
    fn list_databases(&self) -> Result<Vec<Result<String, PipelineError>>, BackupError> {
        let output = self
            .executor
            .run_query(&self.builder.list_databases())
            .map_err(|e| {
                error!("Failed to list databases on {}: {}", self.server, e);
                BackupError::Listing(e)
            })?;

        let databases: Vec<_> = output
            .stdout
            .split(|&byte| byte == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| {
                String::from_utf8(line.to_vec()).map_err(|_| PipelineError::InvalidTarget {
                    name: String::from_utf8_lossy(line).into_owned(),
                    reason: "name is not valid UTF-8",
                })
            })
            .collect();

        info!("Received {} databases from {}", databases.len(), self.server);
        Ok(databases)
    }

    /// Back up one database; errors end here and never reach the caller
    fn backup_database(&self, name: &str) -> DatabaseOutcome {
        if !self.policy.is_database_enabled(name) {
            info!("Database '{}' is disabled in policy, skipping", name);
            return DatabaseOutcome::SkippedDisabled;
        }

        info!("Starting backup of database '{}'", name);

        match self.dump_database(name) {
            Ok(archive) => {
                info!("Backed up database '{}' to {}", name, archive.display());
                DatabaseOutcome::Succeeded { archive }
            }
            Err(e) => {
                error!("Failed to back up database '{}': {}", name, e);
                DatabaseOutcome::Failed(e)
            }
        }
    }

    fn dump_database(&self, name: &str) -> Result<PathBuf, UnitError> {
        let command = self
            .builder
            .database_dump(name, self.policy.excluded_schemas(name))?;
        self.executor.run_pipeline(&command)?;
        Ok(command.sink.path().to_path_buf())
    }

    fn backup_globals(&self) -> Result<PathBuf, UnitError> {
        info!("Starting backup of globals");

        let command = self.builder.globals_dump();
        match self.executor.run_pipeline(&command) {
            Ok(()) => {
                let archive = command.sink.path().to_path_buf();
                info!("Backed up globals to {}", archive.display());
                Ok(archive)
            }
            Err(e) => {
                error!("Failed to back up globals: {}", e);
                Err(e.into())
            }
        }
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}
