use super::*;
use std::io::Write;

#[test]
fn test_parse_minimal_config() {
    let config = Config::parse("name: prod").unwrap();
    assert_eq!(config.name, "prod");
    assert_eq!(config.engine, EngineConfig::default());
    assert_eq!(config.engine.t1_t2_threshold_bytes, 10 * 1024 * 1024);
    assert_eq!(config.engine.max_priority, 10);
    assert_eq!(config.source.kind, SourceKind::DuckDb);
    assert_eq!(config.ledger.kind, LedgerKind::File);
    assert_eq!(config.schedule.interval_hours, 6);
}

#[test]
fn test_sample_config_parses() {
    let config = Config::parse(SAMPLE_CONFIG).unwrap();
    assert_eq!(config.name, "scanwatch");
    assert_eq!(config.engine.conflict_retries, 3);
    assert_eq!(config.output.scripts_dir, "output/generated_scripts");
    assert_eq!(
        config.schedule.anchor_time().unwrap(),
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    );
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: warehouse
engine:
  t1_t2_threshold_bytes: 1048576
  max_priority: 8
  concurrency_limit: 2
  adapter_timeout_seconds: 5
source:
  type: snapshot
  path: snapshots/today.yml
ledger:
  type: duckdb
  path: state/ledger.duckdb
schedule:
  interval_hours: 4
  anchor: "02:30"
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.engine.max_priority, 8);
    assert_eq!(config.engine.adapter_timeout(), Duration::from_secs(5));
    assert_eq!(config.source.kind, SourceKind::Snapshot);
    assert_eq!(config.ledger.kind, LedgerKind::DuckDb);
    assert_eq!(
        config.schedule.anchor_time().unwrap(),
        NaiveTime::from_hms_opt(2, 30, 0).unwrap()
    );
}

#[test]
fn test_unknown_field_rejected() {
    let err = Config::parse("name: x\nengine:\n  max_prio: 3\n").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn test_max_priority_out_of_range() {
    let err = Config::parse("name: x\nengine:\n  max_priority: 11\n").unwrap_err();
    assert!(err.to_string().contains("[E003]"));

    let err = Config::parse("name: x\nengine:\n  max_priority: 0\n").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_zero_concurrency_rejected() {
    let err = Config::parse("name: x\nengine:\n  concurrency_limit: 0\n").unwrap_err();
    assert!(err.to_string().contains("concurrency_limit"));
}

#[test]
fn test_sub_second_adapter_timeout() {
    let config = Config::parse("name: x\nengine:\n  adapter_timeout_seconds: 0.25\n").unwrap();
    assert_eq!(config.engine.adapter_timeout(), Duration::from_millis(250));
}

#[test]
fn test_bad_adapter_timeout_rejected() {
    for value in ["0", "-1.5", ".inf", ".nan", "90000"] {
        let yaml = format!("name: x\nengine:\n  adapter_timeout_seconds: {value}\n");
        let err = Config::parse(&yaml).unwrap_err();
        assert!(
            err.to_string().contains("adapter_timeout_seconds"),
            "{value}: {err}"
        );
    }
}

#[test]
fn test_bad_anchor_rejected() {
    let err = Config::parse("name: x\nschedule:\n  anchor: noon\n").unwrap_err();
    assert!(err.to_string().contains("schedule.anchor"));
}

#[test]
fn test_empty_name_rejected() {
    assert!(Config::parse("name: '  '").is_err());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "name: local\nledger:\n  path: state/ledger.json").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.ledger_path(), dir.path().join("state/ledger.json"));
    assert_eq!(config.target_dir(), dir.path().join("target"));
}

#[test]
fn test_load_reports_path_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "name: [unclosed").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config.name, "scanwatch");
    assert_eq!(config.source_path(), dir.path().join("telemetry.duckdb"));
}

#[test]
fn test_absolute_paths_kept() {
    let config = Config::with_defaults("abs", "/srv/scanwatch");
    assert_eq!(config.resolve("/var/lib/x.json"), PathBuf::from("/var/lib/x.json"));
    assert_eq!(
        config.scripts_dir(),
        PathBuf::from("/srv/scanwatch/output/generated_scripts")
    );
}
