// SPDX-License-Identifier: Apache-2.0

//! PostgreSQL Driver
//!
//! Implements `QueryEngine` for PostgreSQL using SQLx. Every query runs on a
//! connection checked out of the pool for the duration of one call; the
//! `PgCursor` borrowing that connection is dropped before the call returns,
//! which hands the connection back to the pool on every exit path.

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row, Statement};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::engine::cursor::RowCursor;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::shaper::collect_bounded;
use crate::engine::traits::{ExportSink, QueryEngine};
use crate::engine::types::{NativeValue, QueryResult};
use crate::export::csv::export_cursor;
use crate::export::types::ExportSummary;

/// PostgreSQL driver implementation
pub struct PostgresDriver {
    pool: PgPool,
}

impl PostgresDriver {
    /// Opens the pool and pings the server once.
    pub async fn connect(config: &DatabaseConfig) -> EngineResult<Self> {
        let mut options = PgConnectOptions::from_str(config.dsn.expose())
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        if config.read_only {
            options = options.options([("default_transaction_read_only", "on")]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn acquire(&self) -> EngineResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))
    }
}

#[async_trait]
impl QueryEngine for PostgresDriver {
    fn driver_id(&self) -> &'static str {
        "postgres"
    }

    async fn execute_bounded(&self, query: &str, limit: usize) -> EngineResult<QueryResult> {
        let started = Instant::now();
        let mut conn = self.acquire().await?;

        let mut cursor = PgCursor::open(&mut *conn, query).await?;
        let result = collect_bounded(&mut cursor, limit, started).await;
        drop(cursor);

        if let Ok(ref r) = result {
            debug!(rows = r.count, more = r.more, duration_ms = r.duration_ms, "postgres query finished");
        }
        result
    }

    async fn export_csv(&self, query: &str, sink: ExportSink<'_>) -> EngineResult<ExportSummary> {
        let mut conn = self.acquire().await?;

        let mut cursor = PgCursor::open(&mut *conn, query).await?;
        let summary = export_cursor(&mut cursor, sink).await;
        drop(cursor);

        summary
    }
}

/// Row cursor over a query running on a borrowed connection
pub struct PgCursor<'c> {
    columns: Vec<String>,
    stream: BoxStream<'c, Result<PgRow, sqlx::Error>>,
}

impl<'c> PgCursor<'c> {
    /// Prepares `query` to learn its columns, then starts streaming rows.
    ///
    /// Column names come from the prepared statement, so a query returning
    /// zero rows still reports them.
    pub async fn open(conn: &'c mut PgConnection, query: &'c str) -> EngineResult<Self> {
        let statement = (&mut *conn)
            .prepare(query)
            .await
            .map_err(|e| EngineError::execution_failed(e.to_string()))?;

        let columns = statement
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let stream = sqlx::query(query).fetch(conn);
        Ok(Self { columns, stream })
    }
}

#[async_trait]
impl RowCursor for PgCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> EngineResult<Option<Vec<NativeValue>>> {
        match self.stream.next().await {
            None => Ok(None),
            Some(Ok(row)) => Ok(Some(convert_row(&row))),
            Some(Err(e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)))) => {
                Err(EngineError::scan_failed(e.to_string()))
            }
            Some(Err(e)) => Err(EngineError::cursor_failed(e.to_string())),
        }
    }
}

/// Converts a SQLx row to driver-level values
fn convert_row(pg_row: &PgRow) -> Vec<NativeValue> {
    (0..pg_row.columns().len())
        .map(|idx| extract_value(pg_row, idx))
        .collect()
}

/// Extracts a value from a PgRow at the given index
///
/// `try_get` checks type compatibility before decoding, so each attempt
/// either matches the column's type or falls through to the next.
fn extract_value(row: &PgRow, idx: usize) -> NativeValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(NativeValue::Int).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|i| NativeValue::Int(i as i64)).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|i| NativeValue::Int(i as i64)).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(NativeValue::Bool).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(NativeValue::Float).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|f| NativeValue::Float(f as f64)).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<sqlx::types::Decimal>, _>(idx) {
        return v.map(|d| NativeValue::Text(d.to_string())).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(NativeValue::Text).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map(NativeValue::Bytes).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return v.map(NativeValue::Json).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(NativeValue::Timestamp).unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|dt| NativeValue::Timestamp(dt.and_utc()))
            .unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| NativeValue::Timestamp(dt.and_utc()))
            .unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v
            .map(|t| NativeValue::Text(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(NativeValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<sqlx::types::Uuid>, _>(idx) {
        return v.map(|u| NativeValue::Text(u.to_string())).unwrap_or(NativeValue::Null);
    }

    debug!(
        column = row.columns()[idx].name(),
        "unsupported postgres type, returning NULL"
    );
    NativeValue::Null
}
