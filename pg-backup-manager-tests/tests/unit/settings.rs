//! Unit tests for settings loading and resolution
//!
//! These tests verify settings file parsing, precedence and validation.

use pg_backup_manager::config::{
    load_settings_file, prepare_directories, resolve_settings, ConfigError, SettingsFile,
};
use rstest::rstest;
use std::path::PathBuf;
use test_utils::{
    fixtures, CompressorKind, Password, SettingsOverrides, TestContext, SAMPLE_PASSWORD,
};

fn overrides(ctx: &TestContext) -> SettingsOverrides {
    SettingsOverrides {
        host: Some("db.test".to_string()),
        password: Some(Password::new(SAMPLE_PASSWORD)),
        output: Some(ctx.output_dir()),
        ..Default::default()
    }
}

#[test]
fn test_minimal_settings_file() {
    let ctx = TestContext::new();
    let path = ctx.write_settings(fixtures::minimal_settings_toml());

    let file = load_settings_file(&path).unwrap();
    let settings = resolve_settings(SettingsOverrides::default(), Some(file)).unwrap();

    assert_eq!(settings.connection.host, "db.test");
    assert_eq!(settings.connection.port, 5432);
    assert_eq!(settings.output_directory, ctx.output_dir());
    assert_eq!(settings.password.expose(), SAMPLE_PASSWORD);
    assert_eq!(settings.compressor.kind, CompressorKind::Gzip);
}

#[test]
fn test_full_settings_file() {
    let ctx = TestContext::new();
    let path = ctx.write_settings(fixtures::full_settings_toml());

    let file = load_settings_file(&path).unwrap();
    let settings = resolve_settings(SettingsOverrides::default(), Some(file)).unwrap();

    assert_eq!(settings.connection.port, 6432);
    assert_eq!(settings.connection.user, "backup");
    assert_eq!(settings.connection.database, "maintenance");
    assert_eq!(settings.compressor.kind, CompressorKind::Xz);
    assert_eq!(settings.compressor.level.get(), 6);
    assert_eq!(settings.log_directory, Some(ctx.log_dir()));
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn test_command_line_overrides_file() {
    let ctx = TestContext::new();
    let path = ctx.write_settings(fixtures::full_settings_toml());
    let file = load_settings_file(&path).unwrap();

    let settings = resolve_settings(
        SettingsOverrides {
            host: Some("override.test".to_string()),
            port: Some(5433),
            compressor: Some(CompressorKind::SevenZ),
            level: Some(1),
            password: Some(Password::new("from-flag")),
            ..Default::default()
        },
        Some(file),
    )
    .unwrap();

    assert_eq!(settings.connection.host, "override.test");
    assert_eq!(settings.connection.port, 5433);
    assert_eq!(settings.connection.user, "backup");
    assert_eq!(settings.compressor.kind, CompressorKind::SevenZ);
    assert_eq!(settings.compressor.level.get(), 1);
    assert_eq!(settings.password.expose(), "from-flag");
}

#[test]
fn test_password_key_rejected_in_file() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "settings.toml",
        "host = \"db.test\"\npassword = \"plaintext\"\n",
    );

    let result = load_settings_file(&path);

    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_unknown_compressor_rejected_in_file() {
    let ctx = TestContext::new();
    let path = ctx.create_file("settings.toml", "compressor = \"bzip2\"\n");

    assert!(matches!(
        load_settings_file(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[rstest]
#[case::host("host")]
#[case::output("output")]
#[case::password("password")]
fn test_missing_required_parameter(#[case] missing: &str) {
    let ctx = TestContext::new();
    let mut overrides = overrides(&ctx);
    match missing {
        "host" => overrides.host = None,
        "output" => overrides.output = None,
        _ => overrides.password = None,
    }

    let result = resolve_settings(overrides, None);

    match result {
        Err(ConfigError::MissingParameter(name)) => assert_eq!(name, missing),
        other => panic!("Expected MissingParameter({}), got {:?}", missing, other),
    }
}

#[rstest]
#[case(0)]
#[case(10)]
#[case(12)]
#[case(-1)]
fn test_level_out_of_range(#[case] level: i64) {
    let ctx = TestContext::new();
    let result = resolve_settings(
        SettingsOverrides {
            level: Some(level),
            ..overrides(&ctx)
        },
        None,
    );

    match result {
        Err(e @ ConfigError::InvalidLevel(_)) => {
            assert_eq!(
                e.to_string(),
                format!("Compression level must be in range 1-9, now is '{}'", level)
            );
        }
        other => panic!("Expected InvalidLevel, got {:?}", other),
    }
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(9)]
fn test_level_in_range(#[case] level: i64) {
    let ctx = TestContext::new();
    let settings = resolve_settings(
        SettingsOverrides {
            level: Some(level),
            ..overrides(&ctx)
        },
        None,
    )
    .unwrap();

    assert_eq!(i64::from(settings.compressor.level.get()), level);
}

#[test]
fn test_password_file_trailing_newline_trimmed() {
    let ctx = TestContext::new();
    let password_file = ctx.create_password_file("s3cret\n");

    let settings = resolve_settings(
        SettingsOverrides {
            password: None,
            password_file: Some(password_file),
            ..overrides(&ctx)
        },
        None,
    )
    .unwrap();

    assert_eq!(settings.password.expose(), "s3cret");
}

#[test]
fn test_password_flag_beats_password_file() {
    let ctx = TestContext::new();
    let settings = resolve_settings(
        SettingsOverrides {
            password_file: Some(PathBuf::from("/nonexistent/pgpass")),
            ..overrides(&ctx)
        },
        None,
    )
    .unwrap();

    assert_eq!(settings.password.expose(), SAMPLE_PASSWORD);
}

#[test]
fn test_password_never_printed() {
    let ctx = TestContext::new();
    let settings = resolve_settings(overrides(&ctx), None).unwrap();

    let debug = format!("{:?}", settings);
    assert!(!debug.contains(SAMPLE_PASSWORD));
}

#[test]
fn test_resolution_creates_nothing() {
    let ctx = TestContext::new();
    let _ = resolve_settings(
        SettingsOverrides {
            level: Some(42),
            ..overrides(&ctx)
        },
        None,
    );

    assert!(!ctx.output_dir().exists());
}

#[test]
fn test_prepare_directories() {
    let ctx = TestContext::new();
    let settings = resolve_settings(
        SettingsOverrides {
            log_directory: Some(ctx.log_dir()),
            ..overrides(&ctx)
        },
        None,
    )
    .unwrap();

    prepare_directories(&settings).unwrap();
    // Existing directories are fine
    prepare_directories(&settings).unwrap();

    assert!(ctx.output_dir().is_dir());
    assert!(ctx.log_dir().is_dir());
}

#[test]
fn test_prepare_directories_blocked_by_file() {
    let ctx = TestContext::new();
    let blocker = ctx.create_file("backups", "not a directory");
    let settings = resolve_settings(
        SettingsOverrides {
            output: Some(blocker),
            ..overrides(&ctx)
        },
        None,
    )
    .unwrap();

    assert!(matches!(
        prepare_directories(&settings),
        Err(ConfigError::DirectoryError { .. })
    ));
}

#[test]
fn test_settings_file_defaults_are_empty() {
    let file = SettingsFile::default();
    assert!(file.host.is_none());
    assert!(file.compressor.is_none());
}
