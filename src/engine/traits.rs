// SPDX-License-Identifier: Apache-2.0

//! QueryEngine trait definition
//!
//! The execution side of dbreader talks to the database only through this
//! trait, so the orchestrator can be exercised against an in-memory engine.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::engine::error::EngineResult;
use crate::engine::types::QueryResult;
use crate::export::types::ExportSummary;

/// Byte sink for streamed exports
pub type ExportSink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Returns the unique identifier for this driver (e.g. "postgres")
    fn driver_id(&self) -> &'static str;

    /// Runs an already-validated query and returns at most `limit` rows.
    ///
    /// `limit` is already clamped. The cursor backing the query is released
    /// before this returns, on success and on every error path.
    async fn execute_bounded(&self, query: &str, limit: usize) -> EngineResult<QueryResult>;

    /// Streams every row of an already-validated query into `sink` as CSV.
    async fn export_csv(&self, query: &str, sink: ExportSink<'_>) -> EngineResult<ExportSummary>;
}
