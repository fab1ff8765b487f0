//! Command tests for pg-backup-manager
//!
//! These tests verify run and validate behavior using a mocked executor.
