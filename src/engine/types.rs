// SPDX-License-Identifier: Apache-2.0

//! Value and result types shared by the execution path
//!
//! `NativeValue` is what a driver cursor yields; `Value` is the
//! transport-safe scalar that ends up in a `QueryResult`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Rows returned when the caller gives no (or a non-positive) limit
pub const DEFAULT_ROW_LIMIT: usize = 200;
/// Hard ceiling on rows returned in interactive mode
pub const MAX_ROW_LIMIT: usize = 1000;

/// Clamp a caller-supplied row limit into `1..=MAX_ROW_LIMIT`.
pub fn clamp_limit(limit: i64) -> usize {
    if limit <= 0 {
        DEFAULT_ROW_LIMIT
    } else if limit as u64 > MAX_ROW_LIMIT as u64 {
        MAX_ROW_LIMIT
    } else {
        limit as usize
    }
}

/// Value as produced by a database driver, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

/// Transport-safe scalar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

/// Interactive display format: RFC 3339, nanosecond precision, `Z` for UTC.
pub fn format_timestamp_display(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// CSV export format: RFC 3339, second precision.
pub fn format_timestamp_export(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Bounded result of an interactive query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows actually returned
    pub count: usize,
    /// True when the cursor had rows beyond the limit
    pub more: bool,
    pub duration_ms: u64,
}
