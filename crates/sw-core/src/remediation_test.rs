use super::*;
use crate::table::TableKey;
use chrono::TimeZone;

fn assessment(priority: u8) -> Assessment {
    Assessment {
        query_id: QueryId::of_sql("SELECT * FROM t"),
        tier: Tier::T1,
        priority,
        improvement_pct: 60.0,
        tables: vec![TableInfo::resolved(TableKey::new(None, "T"), Some(1), None, 10)],
        remediation: Remediation::Refactor,
        degraded: false,
        sample_sql: "SELECT * FROM t".to_string(),
        schema: None,
        executions: 5,
        elapsed_us: 50,
    }
}

fn stamp() -> RunStamp {
    RunStamp::at("run-1", Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap())
}

#[test]
fn test_first_detection() {
    let record = RemediationRecord::first_detection(assessment(3), &stamp());
    assert_eq!(record.status, RemediationStatus::New);
    assert_eq!(record.occurrence_count, 1);
    assert_eq!(record.version, 1);
    assert_eq!(record.first_seen, record.last_seen);
    assert!(record.artifact_pending);
}

#[test]
fn test_refresh_keeps_history() {
    let mut record = RemediationRecord::first_detection(assessment(3), &stamp());
    record.occurrence_count = 4;
    record.status = RemediationStatus::Recurring;

    record.refresh_from(assessment(7));
    assert_eq!(record.priority, 7);
    assert_eq!(record.occurrence_count, 4);
    assert_eq!(record.status, RemediationStatus::Recurring);
}

#[test]
fn test_status_wire_format() {
    let json = serde_json::to_string(&RemediationStatus::ResolvedPendingVerification).unwrap();
    assert_eq!(json, "\"RESOLVED_PENDING_VERIFICATION\"");
    assert_eq!(
        "recurring".parse::<RemediationStatus>().unwrap(),
        RemediationStatus::Recurring
    );
    assert!("gone".parse::<RemediationStatus>().is_err());
}

#[test]
fn test_remediation_wire_format() {
    let fix = Remediation::CreateIndex {
        table: "HR.EMP".to_string(),
        columns: vec!["DEPT_ID".to_string()],
    };
    let json = serde_json::to_value(&fix).unwrap();
    assert_eq!(json["kind"], "create_index");
    assert_eq!(json["table"], "HR.EMP");
    assert_eq!(fix.kind(), "index");
}

#[test]
fn test_record_json_round_trip() {
    let record = RemediationRecord::first_detection(assessment(2), &stamp());
    let json = serde_json::to_string(&record).unwrap();
    let back: RemediationRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}
