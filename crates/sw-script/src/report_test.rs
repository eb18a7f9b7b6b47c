use super::*;
use chrono::TimeZone;
use sw_core::{Assessment, QueryId, RunStamp, TableInfo, TableKey};

fn record(sql: &str, tier: Tier, priority: u8, remediation: Remediation) -> RemediationRecord {
    let assessment = Assessment {
        query_id: QueryId::of_sql(sql),
        tier,
        priority,
        improvement_pct: 42.0,
        tables: vec![TableInfo::resolved(
            TableKey::new(Some("APP".to_string()), "ORDERS"),
            Some(2 * 1024 * 1024),
            None,
            10 * 1024 * 1024,
        )],
        remediation,
        degraded: false,
        sample_sql: sql.to_string(),
        schema: Some("APP".to_string()),
        executions: 10,
        elapsed_us: 1,
    };
    let run = RunStamp::at("r1", Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap());
    RemediationRecord::first_detection(assessment, &run)
}

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap()
}

#[test]
fn test_report_groups_records_by_tier() {
    let records = vec![
        record("SELECT * FROM big", Tier::T2, 9, Remediation::Refactor),
        record(
            "SELECT * FROM orders WHERE status = 1",
            Tier::T1,
            3,
            Remediation::CreateIndex {
                table: "APP.ORDERS".to_string(),
                columns: vec!["STATUS".to_string()],
            },
        ),
    ];
    let report = FtsReport {
        generated_at: generated_at(),
        run_id: Some("run-7"),
        records: &records,
        schemas: vec![ReportSchema {
            schema: "APP".to_string(),
            class: "HEAVY".to_string(),
            queries: 2,
            executions: 1200,
            elapsed_seconds: 93.456,
        }],
    };
    let html = ReportRenderer::new().unwrap().render(&report).unwrap();

    assert!(html.contains("Generated 2024-06-01 06:30 UTC for run run-7"));
    let t1 = html.find("<h2>T1 (1)</h2>").unwrap();
    let t2 = html.find("<h2>T2 (1)</h2>").unwrap();
    assert!(t1 < t2);
    assert!(html.contains("CREATE INDEX on APP.ORDERS (STATUS)"));
    assert!(html.contains("APP.ORDERS (T1, 2.0 MiB)"));
    assert!(html.contains("<td>HEAVY</td>"));
    assert!(html.contains("<td>93.46</td>"));
    assert!(!html.contains("No full table scans"));
}

#[test]
fn test_report_escapes_statement_text() {
    let records = vec![record(
        "SELECT * FROM t WHERE name = '<b>x</b>' AND a < b",
        Tier::T2,
        5,
        Remediation::Refactor,
    )];
    let report = FtsReport {
        generated_at: generated_at(),
        run_id: None,
        records: &records,
        schemas: Vec::new(),
    };
    let html = ReportRenderer::new().unwrap().render(&report).unwrap();

    assert!(html.contains("&lt;b&gt;x&lt;&#x2f;b&gt;") || html.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(!html.contains("<b>x</b>"));
    assert!(!html.contains("Schema load"));
    assert!(!html.contains("for run"));
}

#[test]
fn test_empty_report() {
    let report = FtsReport {
        generated_at: generated_at(),
        run_id: None,
        records: &[],
        schemas: Vec::new(),
    };
    let html = ReportRenderer::new().unwrap().render(&report).unwrap();
    assert!(html.contains("No full table scans to report."));
    assert!(!html.contains("<h2>T1"));
}

#[test]
fn test_write_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target/nested").join(REPORT_FILE);
    let records = vec![record("SELECT * FROM big", Tier::T2, 9, Remediation::Refactor)];
    let report = FtsReport {
        generated_at: generated_at(),
        run_id: Some("run-1"),
        records: &records,
        schemas: Vec::new(),
    };

    let renderer = ReportRenderer::new().unwrap();
    renderer.write(&report, &path).unwrap();
    renderer.write(&report, &path).unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("SELECT * FROM big"));
    let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1);
}
