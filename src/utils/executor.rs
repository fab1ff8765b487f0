//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use super::command::{ProcessError, QueryOutput};
use super::pipeline::{BackupCommand, CommandSpec};
use crate::config::Password;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a single command and capture its output
    fn run_query(&self, command: &CommandSpec) -> Result<QueryOutput, ProcessError>;

    /// Run a dump tool piped into a compressor, writing one archive
    fn run_pipeline(&self, command: &BackupCommand) -> Result<(), ProcessError>;
}

/// Default implementation using real subprocess calls
///
/// Holds the password so it can be handed to each child that needs it.
#[derive(Debug, Clone)]
pub struct RealExecutor {
    password: Password,
}

impl RealExecutor {
    pub fn new(password: Password) -> Self {
        Self { password }
    }
}

impl CommandExecutor for RealExecutor {
    fn run_query(&self, command: &CommandSpec) -> Result<QueryOutput, ProcessError> {
        super::command::run_command(command, Some(&self.password))
    }

    fn run_pipeline(&self, command: &BackupCommand) -> Result<(), ProcessError> {
        super::command::run_pipeline(command, Some(&self.password))
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::utils::pipeline::BackupTarget;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Recorded invocation
    #[derive(Clone, Debug)]
    pub enum RecordedCall {
        Query(CommandSpec),
        Pipeline(BackupCommand),
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        /// Successful output that need not be valid UTF-8
        RawSuccess(Vec<u8>),
        Failure { stderr: String, exit_code: i32 },
        NotFound,
    }

    impl MockResponse {
        pub fn ok() -> Self {
            Self::default()
        }

        pub fn failure(stderr: &str, exit_code: i32) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code,
            }
        }
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded invocations, in order
        pub calls: Arc<Mutex<Vec<RecordedCall>>>,
        /// Response to every listing query
        query_response: Arc<Mutex<MockResponse>>,
        /// Pre-configured responses: backup target -> response
        responses: Arc<Mutex<HashMap<BackupTarget, MockResponse>>>,
        /// Default response for targets without a specific response
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer listing queries with the given database names, one per line
        pub fn with_databases(self, names: &[&str]) -> Self {
            let stdout = names.iter().map(|name| format!("{}\n", name)).collect();
            self.expect_query(MockResponse::Success {
                stdout,
                stderr: String::new(),
            })
        }

        /// Answer listing queries with raw bytes
        pub fn with_listing_bytes(self, stdout: &[u8]) -> Self {
            self.expect_query(MockResponse::RawSuccess(stdout.to_vec()))
        }

        /// Configure the response for listing queries
        pub fn expect_query(self, response: MockResponse) -> Self {
            *self.query_response.lock().unwrap() = response;
            self
        }

        /// Configure a response for a specific backup target
        pub fn expect(self, target: BackupTarget, response: MockResponse) -> Self {
            self.responses.lock().unwrap().insert(target, response);
            self
        }

        /// Set the default response for unconfigured targets
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Number of listing queries issued
        pub fn query_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, RecordedCall::Query(_)))
                .count()
        }

        /// Pipelines run, in order
        pub fn pipelines(&self) -> Vec<BackupCommand> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    RecordedCall::Pipeline(cmd) => Some(cmd.clone()),
                    RecordedCall::Query(_) => None,
                })
                .collect()
        }

        /// Targets of the pipelines run, in order
        pub fn pipeline_targets(&self) -> Vec<BackupTarget> {
            self.pipelines().into_iter().map(|cmd| cmd.target).collect()
        }

        /// Check if a target was dumped
        pub fn was_dumped(&self, target: &BackupTarget) -> bool {
            self.pipeline_targets().iter().any(|t| t == target)
        }

        fn execute_response(&self, program: String, response: MockResponse) -> Result<QueryOutput, ProcessError> {
            match response {
                MockResponse::Success { stdout, stderr } => Ok(QueryOutput {
                    stdout: stdout.into_bytes(),
                    stderr,
                }),
                MockResponse::RawSuccess(stdout) => Ok(QueryOutput {
                    stdout,
                    stderr: String::new(),
                }),
                MockResponse::Failure { stderr, exit_code } => Err(ProcessError::Exit {
                    program,
                    code: Some(exit_code),
                    stderr,
                }),
                MockResponse::NotFound => Err(ProcessError::Spawn {
                    program,
                    source: io::Error::from(io::ErrorKind::NotFound),
                }),
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_query(&self, command: &CommandSpec) -> Result<QueryOutput, ProcessError> {
            self.calls
                .lock()
                .unwrap()
                .push(RecordedCall::Query(command.clone()));
            let response = self.query_response.lock().unwrap().clone();
            self.execute_response(command.program.display().to_string(), response)
        }

        fn run_pipeline(&self, command: &BackupCommand) -> Result<(), ProcessError> {
            self.calls
                .lock()
                .unwrap()
                .push(RecordedCall::Pipeline(command.clone()));
            let response = self
                .responses
                .lock()
                .unwrap()
                .get(&command.target)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone());
            self.execute_response(command.dump.program.display().to_string(), response)
                .map(|_| ())
        }
    }
}
