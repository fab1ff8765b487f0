//! PostgreSQL integration tests
//!
//! These tests require Docker and verify complete backup runs against a
//! real server, then restore the archives to check their contents.
//! Run with: `cargo test -p pg-backup-manager-tests --test integration -- --ignored`

use super::common::{self, CONTAINER_PASSWORD};
use pg_backup_manager::config::{self, CompressorKind, Password, SettingsOverrides};
use pg_backup_manager::utils::{RealExecutor, ToolPaths};
use pg_backup_manager::{BackupError, BackupManager, DatabaseOutcome};
use serial_test::serial;
use std::process::{Command, Stdio};
use test_utils::{PolicyBuilder, TestContext};

fn skip_reason() -> Option<&'static str> {
    if !common::is_docker_available() {
        return Some("Docker not available");
    }
    if !common::client_tools_available() {
        return Some("PostgreSQL client tools or gzip not on PATH");
    }
    None
}

fn overrides(ctx: &TestContext, port: u16, password: &str) -> SettingsOverrides {
    SettingsOverrides {
        host: Some("127.0.0.1".to_string()),
        port: Some(port),
        password: Some(Password::new(password)),
        output: Some(ctx.output_dir()),
        compressor: Some(CompressorKind::Gzip),
        level: Some(1),
        ..Default::default()
    }
}

/// Decompress a custom-format archive and list its table of contents
fn archive_contents(path: &std::path::Path) -> String {
    let gunzip = Command::new("gzip")
        .arg("-dc")
        .arg(path)
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to run gzip");

    let output = Command::new("pg_restore")
        .arg("-l")
        .stdin(gunzip.stdout.expect("gzip stdout"))
        .output()
        .expect("Failed to run pg_restore");

    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Full run: templates skipped, schema exclusion honoured, globals written
#[test]
#[ignore] // Requires Docker
#[serial]
fn test_backup_run_against_server() {
    if let Some(reason) = skip_reason() {
        println!("{}, skipping test", reason);
        return;
    }

    let container = "pg-backup-manager-test-run";
    let port = 55432;
    let _guard = common::start_postgres_container(container, port)
        .expect("Failed to start PostgreSQL");

    common::exec_sql(container, "postgres", "CREATE DATABASE appdb").unwrap();
    common::exec_sql(
        container,
        "appdb",
        "CREATE SCHEMA audit; \
         CREATE TABLE audit.events (id SERIAL PRIMARY KEY); \
         CREATE TABLE public.orders (id SERIAL PRIMARY KEY, item TEXT); \
         INSERT INTO public.orders (item) VALUES ('widget')",
    )
    .unwrap();

    let ctx = TestContext::new();
    let settings = ctx
        .resolve(overrides(&ctx, port, CONTAINER_PASSWORD))
        .unwrap();
    config::prepare_directories(&settings).unwrap();

    let policy = PolicyBuilder::templates_disabled()
        .exclude_schemas("appdb", &["audit"])
        .build();
    let tools = ToolPaths::resolve(settings.compressor.kind).unwrap();
    let manager = BackupManager::new(
        &settings,
        tools,
        policy,
        RealExecutor::new(settings.password.clone()),
    );

    let report = manager.run().expect("Backup run failed");

    assert!(!report.has_failures(), "Run reported failures: {:?}", report);
    assert!(matches!(
        report.outcome("template0"),
        Some(DatabaseOutcome::SkippedDisabled)
    ));

    let out = ctx.output_dir();
    assert!(out.join("postgres.tar.gz").exists());
    assert!(out.join("appdb.tar.gz").exists());
    assert!(out.join("globals.sql.gz").exists());
    assert!(!out.join("template0.tar.gz").exists());
    assert!(!out.join("template1.tar.gz").exists());

    let toc = archive_contents(&out.join("appdb.tar.gz"));
    assert!(toc.contains("orders"), "appdb archive should contain orders");
    assert!(!toc.contains("events"), "audit schema should be excluded");
}

/// Wrong password: the listing fails and nothing is written
#[test]
#[ignore] // Requires Docker
#[serial]
fn test_backup_run_with_wrong_password() {
    if let Some(reason) = skip_reason() {
        println!("{}, skipping test", reason);
        return;
    }

    let container = "pg-backup-manager-test-auth";
    let port = 55433;
    let _guard = common::start_postgres_container(container, port)
        .expect("Failed to start PostgreSQL");

    let ctx = TestContext::new();
    let settings = ctx
        .resolve(overrides(&ctx, port, "not-the-password"))
        .unwrap();
    config::prepare_directories(&settings).unwrap();

    let tools = ToolPaths::resolve(settings.compressor.kind).unwrap();
    let manager = BackupManager::new(
        &settings,
        tools,
        PolicyBuilder::new().build(),
        RealExecutor::new(settings.password.clone()),
    );

    let result = manager.run();

    assert!(matches!(result, Err(BackupError::Listing(_))));
    let written = std::fs::read_dir(ctx.output_dir()).unwrap().count();
    assert_eq!(written, 0, "No archive should be written");
}

/// A rerun overwrites the previous archives in place
#[test]
#[ignore] // Requires Docker
#[serial]
fn test_backup_rerun_overwrites_archives() {
    if let Some(reason) = skip_reason() {
        println!("{}, skipping test", reason);
        return;
    }

    let container = "pg-backup-manager-test-rerun";
    let port = 55434;
    let _guard = common::start_postgres_container(container, port)
        .expect("Failed to start PostgreSQL");

    let ctx = TestContext::new();
    let settings = ctx
        .resolve(overrides(&ctx, port, CONTAINER_PASSWORD))
        .unwrap();
    config::prepare_directories(&settings).unwrap();
    std::fs::write(ctx.output_dir().join("postgres.tar.gz"), "stale").unwrap();

    let tools = ToolPaths::resolve(settings.compressor.kind).unwrap();
    let manager = BackupManager::new(
        &settings,
        tools,
        PolicyBuilder::templates_disabled().build(),
        RealExecutor::new(settings.password.clone()),
    );

    manager.run().unwrap();
    let report = manager.run().unwrap();

    assert!(!report.has_failures());
    let archive = std::fs::read(ctx.output_dir().join("postgres.tar.gz")).unwrap();
    // gzip magic
    assert_eq!(&archive[..2], &[0x1f, 0x8b]);
}
