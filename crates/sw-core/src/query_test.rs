use super::*;

fn raw(sql: &str, executions: u64, elapsed_us: u64) -> RawQueryStats {
    RawQueryStats {
        source_id: None,
        sql_text: sql.to_string(),
        schema: Some("sales".to_string()),
        executions,
        elapsed_us,
    }
}

#[test]
fn test_query_id_ignores_whitespace_and_case() {
    let a = QueryRecord::from_raw(raw("select * from orders", 1, 1));
    let b = QueryRecord::from_raw(raw("SELECT *\n  FROM ORDERS;", 1, 1));
    assert_eq!(a.query_id, b.query_id);
    assert_eq!(a.query_id, QueryId::of_sql("Select * From Orders"));
}

#[test]
fn test_from_raw_extracts_shape() {
    let record = QueryRecord::from_raw(raw(
        "SELECT * FROM orders o JOIN crm.customers c ON c.id = o.cust WHERE o.status = 'X'",
        5,
        100,
    ));
    assert_eq!(record.schema.as_deref(), Some("SALES"));
    assert_eq!(record.tables.len(), 2);
    assert_eq!(record.tables[1].qualified(), "CRM.CUSTOMERS");
    assert_eq!(record.predicate_columns.len(), 1);
    assert_eq!(record.predicate_columns[0].name, "STATUS");
    assert_eq!(record.predicate_columns[0].table, Some(TableRef::new(None, "ORDERS")));
    assert_eq!(record.normalized_text.split(' ').next(), Some("SELECT"));
}

#[test]
fn test_lookup_schema_prefers_parsing_schema() {
    let record = QueryRecord::from_raw(raw("SELECT * FROM crm.customers", 1, 1));
    assert_eq!(
        record.lookup_schema(&record.tables[0]).as_deref(),
        Some("SALES")
    );

    let mut unscoped = raw("SELECT * FROM crm.customers", 1, 1);
    unscoped.schema = None;
    let record = QueryRecord::from_raw(unscoped);
    assert_eq!(
        record.lookup_schema(&record.tables[0]).as_deref(),
        Some("CRM")
    );
}

#[test]
fn test_blank_schema_is_none() {
    let mut row = raw("SELECT 1 FROM t", 1, 1);
    row.schema = Some("  ".to_string());
    assert_eq!(QueryRecord::from_raw(row).schema, None);
}

#[test]
fn test_merge_duplicates_sums_stats() {
    let mut first = raw("SELECT * FROM t WHERE a = 1", 3, 300);
    first.source_id = Some("abc".to_string());
    let mut second = raw("select * from t where a = 1", 7, 700);
    second.source_id = Some("def".to_string());
    let other = raw("SELECT * FROM u", 1, 10);

    let merged = merge_duplicates(vec![
        QueryRecord::from_raw(first),
        QueryRecord::from_raw(other),
        QueryRecord::from_raw(second),
    ]);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].executions, 10);
    assert_eq!(merged[0].elapsed_us, 1000);
    assert_eq!(merged[0].source_ids, vec!["abc", "def"]);
    assert_eq!(merged[1].tables[0].name, "U");
}

#[test]
fn test_query_id_short() {
    let id = QueryId::of_sql("SELECT 1");
    assert_eq!(id.short(12).len(), 12);
    assert!(id.as_str().starts_with(id.short(12)));
}

#[test]
fn test_query_id_rejects_empty() {
    assert!(QueryId::try_new("").is_none());
    assert!(serde_json::from_str::<QueryId>("\"\"").is_err());
    let id: QueryId = serde_json::from_str("\"abc\"").unwrap();
    assert_eq!(id, "abc");
}
