// SPDX-License-Identifier: Apache-2.0

//! Result shaping: turns a driver cursor into a size-bounded `QueryResult`.

use std::time::Instant;

use crate::engine::cursor::RowCursor;
use crate::engine::error::EngineResult;
use crate::engine::types::{
    format_timestamp_display, format_timestamp_export, NativeValue, QueryResult, Value,
};

/// Map a driver value to a transport-safe scalar for interactive display.
pub fn normalize_value(value: NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(b) => Value::Bool(b),
        NativeValue::Int(i) => Value::Int(i),
        NativeValue::Float(f) => Value::Float(f),
        NativeValue::Text(s) => Value::Text(s),
        NativeValue::Bytes(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
        NativeValue::Timestamp(ts) => Value::Text(format_timestamp_display(&ts)),
        NativeValue::Json(j) => Value::Json(j),
    }
}

pub fn normalize_row(row: Vec<NativeValue>) -> Vec<Value> {
    row.into_iter().map(normalize_value).collect()
}

/// Render a driver value as a CSV field.
pub fn format_csv_value(value: &NativeValue) -> String {
    match value {
        NativeValue::Null => String::new(),
        NativeValue::Bool(b) => b.to_string(),
        NativeValue::Int(i) => i.to_string(),
        NativeValue::Float(f) => f.to_string(),
        NativeValue::Text(s) => s.clone(),
        NativeValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        NativeValue::Timestamp(ts) => format_timestamp_export(ts),
        NativeValue::Json(j) => j.to_string(),
    }
}

/// Read at most `limit` rows from `cursor`.
///
/// `limit` must already be clamped. When the cursor yields a row past the
/// limit, iteration stops, `more` is set and the rest of the cursor is left
/// unread for the caller to drop. `started` is taken just before the query
/// was dispatched.
pub async fn collect_bounded<C>(
    cursor: &mut C,
    limit: usize,
    started: Instant,
) -> EngineResult<QueryResult>
where
    C: RowCursor + ?Sized,
{
    let columns = cursor.columns().to_vec();
    let mut rows = Vec::with_capacity(limit.min(64));
    let mut more = false;

    while let Some(row) = cursor.next_row().await? {
        if rows.len() >= limit {
            more = true;
            break;
        }
        rows.push(normalize_row(row));
    }

    Ok(QueryResult {
        columns,
        count: rows.len(),
        rows,
        more,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cursor::MemoryCursor;
    use crate::engine::error::EngineError;
    use chrono::{TimeZone, Utc};

    fn int_rows(n: i64) -> Vec<Vec<NativeValue>> {
        (0..n).map(|i| vec![NativeValue::Int(i)]).collect()
    }

    fn cursor(n: i64) -> MemoryCursor {
        MemoryCursor::new(vec!["n".to_string()], int_rows(n))
    }

    #[tokio::test]
    async fn test_more_rows_than_limit() {
        let mut cur = cursor(10);
        let result = collect_bounded(&mut cur, 3, Instant::now()).await.unwrap();

        assert_eq!(result.count, 3);
        assert_eq!(result.rows.len(), 3);
        assert!(result.more);
        assert_eq!(result.rows[2], vec![Value::Int(2)]);
        // One row peeked past the limit, the rest untouched
        assert_eq!(cur.remaining(), 6);
    }

    #[tokio::test]
    async fn test_fewer_rows_than_limit() {
        let mut cur = cursor(2);
        let result = collect_bounded(&mut cur, 5, Instant::now()).await.unwrap();

        assert_eq!(result.count, 2);
        assert!(!result.more);
    }

    #[tokio::test]
    async fn test_exactly_limit_rows_is_not_truncated() {
        let mut cur = cursor(4);
        let result = collect_bounded(&mut cur, 4, Instant::now()).await.unwrap();

        assert_eq!(result.count, 4);
        assert!(!result.more);
    }

    #[tokio::test]
    async fn test_zero_rows_keeps_columns() {
        let mut cur = cursor(0);
        let result = collect_bounded(&mut cur, 200, Instant::now()).await.unwrap();

        assert_eq!(result.columns, vec!["n".to_string()]);
        assert!(result.rows.is_empty());
        assert_eq!(result.count, 0);
        assert!(!result.more);
    }

    #[tokio::test]
    async fn test_scan_failure_returns_no_partial_result() {
        let mut cur = cursor(5).failing_after(2);
        let err = collect_bounded(&mut cur, 10, Instant::now()).await.unwrap_err();

        assert!(matches!(err, EngineError::ScanFailed { .. }));
    }

    #[test]
    fn test_normalize_value() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 20, 8, 30, 0).unwrap();

        assert_eq!(normalize_value(NativeValue::Null), Value::Null);
        assert_eq!(
            normalize_value(NativeValue::Bytes(b"caf\xc3\xa9".to_vec())),
            Value::Text("café".to_string())
        );
        assert_eq!(
            normalize_value(NativeValue::Bytes(vec![0x66, 0xff])),
            Value::Text("f\u{fffd}".to_string())
        );
        assert_eq!(
            normalize_value(NativeValue::Timestamp(ts)),
            Value::Text("2023-12-20T08:30:00.000000000Z".to_string())
        );
        assert_eq!(normalize_value(NativeValue::Float(1.5)), Value::Float(1.5));
        assert_eq!(
            normalize_value(NativeValue::Json(serde_json::json!({"a": 1}))),
            Value::Json(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_format_csv_value() {
        let ts = Utc.with_ymd_and_hms(2023, 12, 20, 8, 30, 0).unwrap();

        assert_eq!(format_csv_value(&NativeValue::Null), "");
        assert_eq!(format_csv_value(&NativeValue::Bool(true)), "true");
        assert_eq!(format_csv_value(&NativeValue::Timestamp(ts)), "2023-12-20T08:30:00Z");
        assert_eq!(format_csv_value(&NativeValue::Bytes(b"raw".to_vec())), "raw");
    }
}
