//! Command construction for listing and dumping
//!
//! Everything here is a pure function of its inputs: no I/O and no
//! process execution. The dump tool's output is piped straight into the
//! compressor by the executor, so no shell ever parses these arguments.

use super::tools::ToolPaths;
use crate::config::{CompressorKind, CompressorSelection, ConnectionProfile};
use std::fmt;
use std::path::{Path, PathBuf};

/// Query used to enumerate databases on the server
pub const LIST_DATABASES_QUERY: &str = "SELECT datname FROM pg_database;";

/// Stem of the globals archive
pub const GLOBALS_STEM: &str = "globals";

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Whether the database password is handed to this process
    pub needs_password: bool,
}

impl CommandSpec {
    fn new(program: &Path, needs_password: bool) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            needs_password,
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a backup command produces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackupTarget {
    Database(String),
    Globals,
}

impl BackupTarget {
    pub fn database(name: impl Into<String>) -> Self {
        BackupTarget::Database(name.into())
    }
}

impl fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupTarget::Database(name) => write!(f, "database '{}'", name),
            BackupTarget::Globals => f.write_str("globals"),
        }
    }
}

/// How the compressor's result reaches the archive file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSink {
    /// The compressor writes to stdout, which is redirected into the file
    Stdout(PathBuf),
    /// The compressor is given the file path as an argument
    Argument(PathBuf),
}

impl ArchiveSink {
    pub fn path(&self) -> &Path {
        match self {
            ArchiveSink::Stdout(path) | ArchiveSink::Argument(path) => path,
        }
    }
}

/// Dump tool piped into a compressor, writing one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCommand {
    pub target: BackupTarget,
    pub dump: CommandSpec,
    pub filter: CommandSpec,
    pub sink: ArchiveSink,
}

impl fmt::Display for BackupCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.dump, self.filter)?;
        if let ArchiveSink::Stdout(path) = &self.sink {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot back up database '{name}': {reason}")]
    InvalidTarget { name: String, reason: &'static str },
}

impl PipelineError {
    /// Database the error refers to
    pub fn name(&self) -> &str {
        match self {
            PipelineError::InvalidTarget { name, .. } => name,
        }
    }
}

/// Builds the commands of a run from immutable settings
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    profile: ConnectionProfile,
    compressor: CompressorSelection,
    tools: ToolPaths,
    output_dir: PathBuf,
}

impl PipelineBuilder {
    pub fn new(
        profile: ConnectionProfile,
        compressor: CompressorSelection,
        tools: ToolPaths,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile,
            compressor,
            tools,
            output_dir: output_dir.into(),
        }
    }

    /// `psql` invocation printing one database name per line
    pub fn list_databases(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.tools.psql, true);
        cmd.arg("-A") // unaligned
            .arg("-q")
            .arg("-t") // tuples only
            .args(["-F", " "]);
        self.connection_args(&mut cmd);
        cmd.args(["-d", self.profile.database.as_str()])
            .args(["-c", LIST_DATABASES_QUERY]);
        cmd
    }

    /// Custom-format, blob-inclusive dump of one database
    pub fn database_dump(
        &self,
        name: &str,
        excluded_schemas: &[String],
    ) -> Result<BackupCommand, PipelineError> {
        validate_database_name(name)?;

        let mut dump = CommandSpec::new(&self.tools.pg_dump, true);
        dump.args(["-F", "c", "-b"]);
        self.connection_args(&mut dump);
        for schema in excluded_schemas {
            dump.args(["-N", schema.as_str()]);
        }
        dump.arg(name);

        let path = self.archive_path(name, "tar");
        let (filter, sink) = self.filter(path);

        Ok(BackupCommand {
            target: BackupTarget::database(name),
            dump,
            filter,
            sink,
        })
    }

    /// Dump of roles, tablespaces and other server-wide objects
    pub fn globals_dump(&self) -> BackupCommand {
        let mut dump = CommandSpec::new(&self.tools.pg_dumpall, true);
        dump.arg("-g");
        self.connection_args(&mut dump);

        let path = self.archive_path(GLOBALS_STEM, "sql");
        let (filter, sink) = self.filter(path);

        BackupCommand {
            target: BackupTarget::Globals,
            dump,
            filter,
            sink,
        }
    }

    fn connection_args(&self, cmd: &mut CommandSpec) {
        cmd.args(["-h", self.profile.host.as_str()])
            .args(["-p".to_string(), self.profile.port.to_string()])
            .args(["-U", self.profile.user.as_str()]);
    }

    fn archive_path(&self, stem: &str, format: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}.{}.{}",
            stem,
            format,
            self.compressor.kind.extension()
        ))
    }

    /// Compressor invocation as a streaming filter at the configured level
    fn filter(&self, path: PathBuf) -> (CommandSpec, ArchiveSink) {
        let level = self.compressor.level;
        let mut cmd = CommandSpec::new(&self.tools.compressor, false);

        match self.compressor.kind {
            CompressorKind::Gzip => {
                cmd.args(["-c".to_string(), format!("-{}", level)]);
                (cmd, ArchiveSink::Stdout(path))
            }
            CompressorKind::Xz | CompressorKind::Lzma => {
                cmd.args(["-zfc".to_string(), format!("-{}", level)]);
                (cmd, ArchiveSink::Stdout(path))
            }
            CompressorKind::SevenZ | CompressorKind::SevenZa => {
                cmd.args([
                    "a".to_string(),
                    "-si".to_string(),
                    format!("-mx={}", level),
                    path.to_string_lossy().into_owned(),
                ]);
                (cmd, ArchiveSink::Argument(path))
            }
        }
    }
}

/// Reject names that would be read as an option or escape the output directory
fn validate_database_name(name: &str) -> Result<(), PipelineError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.starts_with('-') {
        "name starts with '-' and would be read as an option"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if name.contains('/') || name.contains('\\') {
        "name contains a path separator"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else {
        return Ok(());
    };

    Err(PipelineError::InvalidTarget {
        name: name.to_string(),
        reason,
    })
}
