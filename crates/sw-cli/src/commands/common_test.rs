use super::*;
use crate::commands::test_support::record;
use sw_core::{RawQueryStats, RemediationStatus};
use sw_db::{Snapshot, SnapshotTable};

fn write_project(dir: &Path, ledger_kind: &str) -> Config {
    let snapshot = Snapshot {
        queries: vec![RawQueryStats {
            source_id: Some("8d3k2".to_string()),
            sql_text: "SELECT * FROM small_tbl WHERE status = 'OPEN'".to_string(),
            schema: Some("APP".to_string()),
            executions: 5,
            elapsed_us: 2_000,
        }],
        tables: vec![SnapshotTable {
            schema: Some("APP".to_string()),
            name: "SMALL_TBL".to_string(),
            size_bytes: Some(2 * 1024 * 1024),
            indexes: Some(vec!["ID".to_string()]),
        }],
    };
    std::fs::write(
        dir.join("telemetry.json"),
        serde_json::to_string(&snapshot).unwrap(),
    )
    .unwrap();
    let yaml = format!(
        "name: test\nsource:\n  type: snapshot\n  path: telemetry.json\nledger:\n  type: {ledger_kind}\n  path: target/ledger.{ext}\n",
        ext = if ledger_kind == "duckdb" { "duckdb" } else { "json" }
    );
    let path = dir.join("scanwatch.yml");
    std::fs::write(&path, yaml).unwrap();
    Config::load(&path).unwrap()
}

#[test]
fn test_calculate_column_widths() {
    let widths = calculate_column_widths(
        &["ID", "TIER"],
        &[
            vec!["3f2a9c01".to_string(), "T1".to_string()],
            vec!["ab".to_string(), "T2".to_string()],
        ],
    );
    assert_eq!(widths, vec![8, 4]);
}

#[test]
fn test_sort_by_urgency() {
    let mut low = record("SELECT * FROM a", 2, RemediationStatus::New);
    low.improvement_pct = 90.0;
    let high = record("SELECT * FROM b", 9, RemediationStatus::Recurring);
    let mut tie = record("SELECT * FROM c", 2, RemediationStatus::New);
    tie.improvement_pct = 20.0;

    let mut records = vec![tie.clone(), low.clone(), high.clone()];
    sort_by_urgency(&mut records);
    let order: Vec<&str> = records.iter().map(|r| r.query_id.as_str()).collect();
    assert_eq!(
        order,
        vec![high.query_id.as_str(), low.query_id.as_str(), tie.query_id.as_str()]
    );
}

#[tokio::test]
async fn test_snapshot_run_writes_scripts_and_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), "file");

    let runner = build_runner(&config, false).unwrap();
    let summary = runner.run_cycle(&Shutdown::never()).await.unwrap();
    assert_eq!(summary.new, 1);
    assert_eq!(summary.emitted, 1);

    report_summary(&config, &summary, true).unwrap();
    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("target").join(RUN_RESULTS_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(results["new"], 1);
    assert_eq!(results["run_id"], summary.run_id.as_str());

    let report = std::fs::read_to_string(dir.path().join("target/fts_report.html")).unwrap();
    assert!(report.contains(&format!("for run {}", summary.run_id)));
    assert!(report.contains(summary.to_emit[0].query_id.short(12)));

    let scripts: Vec<_> = std::fs::read_dir(config.scripts_dir()).unwrap().collect();
    assert_eq!(scripts.len(), 1);
    assert!(config.ledger_path().exists());
}

#[tokio::test]
async fn test_dry_run_writes_no_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), "file");

    let summary = build_runner(&config, true)
        .unwrap()
        .run_cycle(&Shutdown::never())
        .await
        .unwrap();
    assert_eq!(summary.to_emit.len(), 1);
    assert!(!config.scripts_dir().exists());
}

#[tokio::test]
async fn test_duckdb_ledger_is_created_under_target() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), "duckdb");

    build_runner(&config, true)
        .unwrap()
        .run_cycle(&Shutdown::never())
        .await
        .unwrap();
    assert!(config.ledger_path().exists());

    let ledger = open_ledger(&config).unwrap();
    assert_eq!(ledger.list().await.unwrap().len(), 1);
}

#[test]
fn test_missing_source_fails_to_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path(), "file");
    std::fs::remove_file(dir.path().join("telemetry.json")).unwrap();
    let err = build_runner(&config, false).err().unwrap();
    assert!(format!("{err:#}").contains("telemetry snapshot"));
}

#[tokio::test]
async fn test_sleep_or_shutdown() {
    assert!(sleep_or_shutdown(Duration::from_millis(1), &Shutdown::never()).await);
    let (trigger, shutdown) = shutdown_channel();
    trigger.trigger();
    assert!(!sleep_or_shutdown(Duration::from_secs(3600), &shutdown).await);
}
