//! Record fixtures for command tests

use chrono::{TimeZone, Utc};
use sw_core::{
    Assessment, QueryId, Remediation, RemediationRecord, RemediationStatus, RunStamp, Tier,
};

pub(crate) fn record(sql: &str, priority: u8, status: RemediationStatus) -> RemediationRecord {
    let assessment = Assessment {
        query_id: QueryId::of_sql(sql),
        tier: if priority >= 5 { Tier::T2 } else { Tier::T1 },
        priority,
        improvement_pct: 60.0,
        tables: Vec::new(),
        remediation: Remediation::Refactor,
        degraded: false,
        sample_sql: sql.to_string(),
        schema: Some("APP".to_string()),
        executions: 5,
        elapsed_us: 100,
    };
    let run = RunStamp::at("run-1", Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    let mut record = RemediationRecord::first_detection(assessment, &run);
    record.status = status;
    record
}
