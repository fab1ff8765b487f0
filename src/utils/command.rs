//! Running external commands and dump-to-compressor pipelines
//!
//! No timeout is applied: a hung child blocks the caller until it exits.

use super::pipeline::{ArchiveSink, BackupCommand, CommandSpec};
use crate::config::Password;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use tracing::{debug, error};

/// Environment variable carrying the password to PostgreSQL client tools
pub const PASSWORD_ENV: &str = "PGPASSWORD";

/// Captured output of a successful command
///
/// Stdout is kept as raw bytes: database names are not guaranteed to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}: {}", exit_label(.code), .stderr.trim())]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to create archive {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn program_name(spec: &CommandSpec) -> String {
    spec.program.display().to_string()
}

fn build_command(spec: &CommandSpec, password: Option<&Password>) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    // Scoped to this child only, the parent environment is left untouched
    match password {
        Some(password) if spec.needs_password => {
            cmd.env(PASSWORD_ENV, password.expose());
        }
        // An inherited PGPASSWORD must not reach the compressor either
        _ if !spec.needs_password => {
            cmd.env_remove(PASSWORD_ENV);
        }
        _ => {}
    }

    cmd
}

fn check_status(spec: &CommandSpec, status: ExitStatus, stderr: &[u8]) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(stderr).into_owned();
    error!("Command failed: {}", spec);
    error!("Stderr: {}", stderr.trim());

    Err(ProcessError::Exit {
        program: program_name(spec),
        code: status.code(),
        stderr,
    })
}

/// Run a single command to completion and capture its output
pub fn run_command(spec: &CommandSpec, password: Option<&Password>) -> Result<QueryOutput, ProcessError> {
    debug!("Running command: {}", spec);

    let output = build_command(spec, password)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ProcessError::Spawn {
            program: program_name(spec),
            source,
        })?;

    check_status(spec, output.status, &output.stderr)?;

    Ok(QueryOutput {
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run the dump tool with its stdout connected straight to the compressor's stdin
///
/// Both processes are waited for. When both fail, the dump tool's failure is
/// the one reported. A failed run may leave a truncated archive behind.
pub fn run_pipeline(command: &BackupCommand, password: Option<&Password>) -> Result<(), ProcessError> {
    debug!("Running pipeline: {}", command);

    let archive = match &command.sink {
        ArchiveSink::Stdout(path) => Some(File::create(path).map_err(|source| {
            ProcessError::Output {
                path: path.clone(),
                source,
            }
        })?),
        ArchiveSink::Argument(_) => None,
    };

    let mut dump = build_command(&command.dump, password)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program_name(&command.dump),
            source,
        })?;

    let dump_stdout = match dump.stdout.take() {
        Some(stdout) => stdout,
        None => {
            reap(&mut dump);
            return Err(ProcessError::Wait {
                program: program_name(&command.dump),
                source: io::Error::other("stdout was not captured"),
            });
        }
    };

    // The Command (and with it the parent's copies of the pipe and archive
    // handles) is dropped at the end of this statement.
    let filter = build_command(&command.filter, password)
        .stdin(Stdio::from(dump_stdout))
        .stdout(match archive {
            Some(file) => Stdio::from(file),
            None => Stdio::piped(),
        })
        .stderr(Stdio::piped())
        .spawn();

    let filter = match filter {
        Ok(child) => child,
        Err(source) => {
            reap(&mut dump);
            return Err(ProcessError::Spawn {
                program: program_name(&command.filter),
                source,
            });
        }
    };

    // Drained concurrently so a chatty dump tool cannot block on a full pipe
    let dump_stderr = dump.stderr.take();
    let drain = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stderr) = dump_stderr {
            let _ = stderr.read_to_end(&mut buf);
        }
        buf
    });

    let filter_output = filter.wait_with_output().map_err(|source| ProcessError::Wait {
        program: program_name(&command.filter),
        source,
    });
    let dump_status = dump.wait().map_err(|source| ProcessError::Wait {
        program: program_name(&command.dump),
        source,
    });
    let dump_stderr = drain.join().unwrap_or_default();

    check_status(&command.dump, dump_status?, &dump_stderr)?;
    let filter_output = filter_output?;
    check_status(&command.filter, filter_output.status, &filter_output.stderr)?;

    Ok(())
}

/// Kill and wait for a child that will not be used
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
