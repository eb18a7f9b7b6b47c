//! Fixtures shared by the store tests

use crate::error::LedgerError;
use crate::store::{PendingWrite, RemediationLedgerStore};
use chrono::{TimeZone, Utc};
use std::time::Duration;
use sw_core::{
    Assessment, QueryId, Remediation, RemediationRecord, RunStamp, TableInfo, TableKey, Tier,
};

pub(crate) fn stamp(run_id: &str, hour: u32) -> RunStamp {
    RunStamp::at(run_id, Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap())
}

pub(crate) fn assessment(sql: &str, tier: Tier, priority: u8) -> Assessment {
    Assessment {
        query_id: QueryId::of_sql(sql),
        tier,
        priority,
        improvement_pct: 60.0,
        tables: vec![TableInfo::resolved(
            TableKey::new(Some("APP".to_string()), "SMALL_TBL"),
            Some(2 * 1024 * 1024),
            None,
            10 * 1024 * 1024,
        )],
        remediation: Remediation::Refactor,
        degraded: false,
        sample_sql: sql.to_string(),
        schema: Some("APP".to_string()),
        executions: 5,
        elapsed_us: 1000,
    }
}

pub(crate) fn record(sql: &str) -> RemediationRecord {
    RemediationRecord::first_detection(assessment(sql, Tier::T1, 1), &stamp("run-a", 0))
}

/// Behaviour every store must share
pub(crate) async fn check_store_contract(store: &dyn RemediationLedgerStore) {
    let mut rec = record("SELECT * FROM small_tbl");
    assert!(store.get(&rec.query_id).await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());

    // insert requires "absent"
    store.put(&rec, None).await.unwrap();
    let err = store.put(&rec, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::ConflictingUpdate { found: Some(1), .. }));

    // round trip is field-identical
    let back = store.get(&rec.query_id).await.unwrap().unwrap();
    assert_eq!(back, rec);

    // update requires the current version
    rec.version = 2;
    rec.occurrence_count = 2;
    store.put(&rec, Some(1)).await.unwrap();
    let err = store.put(&rec, Some(1)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ConflictingUpdate {
            expected: Some(1),
            found: Some(2),
            ..
        }
    ));
    assert_eq!(store.get(&rec.query_id).await.unwrap().unwrap().occurrence_count, 2);

    store.put(&record("SELECT * FROM other"), None).await.unwrap();
    assert_eq!(store.list().await.unwrap().len(), 2);

    // a batch with one stale version stores nothing
    let fresh = record("SELECT * FROM fresh");
    let mut bumped = rec.clone();
    bumped.version = 3;
    bumped.occurrence_count = 3;
    let batch = [
        PendingWrite {
            record: fresh.clone(),
            expected_version: None,
        },
        PendingWrite {
            record: bumped.clone(),
            expected_version: Some(1),
        },
    ];
    let err = store.put_all(&batch).await.unwrap_err();
    assert!(matches!(err, LedgerError::ConflictingUpdate { found: Some(2), .. }));
    assert!(store.get(&fresh.query_id).await.unwrap().is_none());
    assert_eq!(store.get(&rec.query_id).await.unwrap().unwrap().version, 2);

    // the same batch with current versions stores everything
    let batch = [
        PendingWrite {
            record: fresh.clone(),
            expected_version: None,
        },
        PendingWrite {
            record: bumped.clone(),
            expected_version: Some(2),
        },
    ];
    store.put_all(&batch).await.unwrap();
    assert_eq!(store.get(&fresh.query_id).await.unwrap(), Some(fresh));
    assert_eq!(store.get(&rec.query_id).await.unwrap().unwrap().occurrence_count, 3);
    assert_eq!(store.list().await.unwrap().len(), 3);
    store.put_all(&[]).await.unwrap();

    // run lease
    let lease = Duration::from_secs(3600);
    let first = stamp("run-1", 0);
    assert_eq!(store.try_begin_run(&first, lease).await.unwrap(), None);
    assert!(store.try_begin_run(&first, lease).await.is_ok());

    let overlapping = stamp("run-2", 0);
    let err = store.try_begin_run(&overlapping, lease).await.unwrap_err();
    assert!(matches!(err, LedgerError::RunInProgress { ref run_id, .. } if run_id == "run-1"));

    let much_later = stamp("run-3", 5);
    let replaced = store.try_begin_run(&much_later, lease).await.unwrap();
    assert_eq!(replaced.map(|l| l.run_id), Some("run-1".to_string()));

    // ending someone else's lease is a no-op
    store.end_run("run-1").await.unwrap();
    assert!(store.try_begin_run(&stamp("run-4", 5), lease).await.is_err());

    store.end_run("run-3").await.unwrap();
    assert!(store.try_begin_run(&stamp("run-4", 5), lease).await.is_ok());
    store.end_run("run-4").await.unwrap();
}
