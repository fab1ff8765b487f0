//! Unit tests for exclusion policy loading and lookup

use pg_backup_manager::config::{load_policy, ConfigError, DatabaseEntry, SchemaEntry};
use rstest::rstest;
use test_utils::{PolicyBuilder, TestContext};

#[test]
fn test_policy_loading_from_file() {
    let ctx = TestContext::new();
    let path = ctx.write_policy(
        &PolicyBuilder::templates_disabled().exclude_schemas("appdb", &["audit"]),
    );

    let policy = load_policy(&path).unwrap();

    assert_eq!(policy.len(), 3);
    assert!(!policy.is_database_enabled("template0"));
    assert!(policy.is_database_enabled("appdb"));
    assert_eq!(policy.excluded_schemas("appdb"), ["audit"]);
}

#[test]
fn test_policy_missing_file() {
    let ctx = TestContext::new();
    let result = load_policy(ctx.temp_dir().join("absent.json"));

    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

#[rstest]
#[case::not_json("this is not json")]
#[case::missing_database_key(r#"{"databases": []}"#)]
#[case::name_not_string(r#"{"database": [{"name": 5}]}"#)]
#[case::truncated(r#"{"database": [{"name": "appdb""#)]
fn test_policy_malformed(#[case] contents: &str) {
    let ctx = TestContext::new();
    let path = ctx.create_file("pg_db.json", contents);

    let result = load_policy(&path);

    assert!(matches!(result, Err(ConfigError::PolicyError { .. })));
}

#[test]
fn test_unlisted_database_has_no_exclusions() {
    let policy = PolicyBuilder::templates_disabled().build();

    assert!(policy.is_database_enabled("appdb"));
    assert!(policy.excluded_schemas("appdb").is_empty());
    assert!(policy.record("appdb").is_none());
}

#[rstest]
#[case::enabled(Some("enabled"), true)]
#[case::missing_state(None, true)]
#[case::unknown_state(Some("paused"), true)]
#[case::disabled(Some("disabled"), false)]
fn test_database_state(#[case] state: Option<&str>, #[case] enabled: bool) {
    let policy = PolicyBuilder::new()
        .add_entry(DatabaseEntry {
            name: "appdb".to_string(),
            state: state.map(str::to_string),
            schema: vec![],
        })
        .build();

    assert_eq!(policy.is_database_enabled("appdb"), enabled);
}

#[test]
fn test_schema_state_is_not_consulted() {
    let policy = PolicyBuilder::new()
        .add_entry(DatabaseEntry {
            name: "appdb".to_string(),
            state: None,
            schema: vec![
                SchemaEntry {
                    name: "audit".to_string(),
                    state: Some("included".to_string()),
                },
                SchemaEntry {
                    name: "scratch".to_string(),
                    state: None,
                },
            ],
        })
        .build();

    assert_eq!(policy.excluded_schemas("appdb"), ["audit", "scratch"]);
}

#[test]
fn test_schemas_of_disabled_database_are_kept() {
    let policy = PolicyBuilder::new()
        .add_entry(DatabaseEntry {
            name: "legacy".to_string(),
            state: Some("disabled".to_string()),
            schema: vec![SchemaEntry {
                name: "old".to_string(),
                state: None,
            }],
        })
        .build();

    assert!(!policy.is_database_enabled("legacy"));
    assert_eq!(policy.excluded_schemas("legacy"), ["old"]);
}

#[test]
fn test_duplicate_entry_first_wins() {
    let policy = PolicyBuilder::new()
        .disable("appdb")
        .exclude_schemas("appdb", &["audit"])
        .build();

    assert_eq!(policy.len(), 1);
    assert!(!policy.is_database_enabled("appdb"));
    assert!(policy.excluded_schemas("appdb").is_empty());
}

#[test]
fn test_entry_without_schema_key() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "pg_db.json",
        r#"{"database": [{"name": "appdb", "state": "enabled"}]}"#,
    );

    let policy = load_policy(&path).unwrap();

    assert!(policy.is_database_enabled("appdb"));
    assert!(policy.excluded_schemas("appdb").is_empty());
}

#[test]
fn test_lookup_is_case_sensitive() {
    let policy = PolicyBuilder::new().disable("AppDB").build();

    assert!(!policy.is_database_enabled("AppDB"));
    assert!(policy.is_database_enabled("appdb"));
}
