// SPDX-License-Identifier: Apache-2.0

//! Schema cache: the current snapshot behind a reader/writer lock.
//!
//! Introspection runs without holding the lock. The write lock is taken only
//! to swap the `Arc`, so readers never wait on a refresh and never see a mix
//! of old and new tables. Two concurrent loads are not coordinated; the last
//! swap wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::schema::catalog::{assemble_tables, CatalogSource};
use crate::schema::types::SchemaSnapshot;

pub struct SchemaCache {
    current: RwLock<Arc<SchemaSnapshot>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(SchemaSnapshot::empty())),
        }
    }

    /// Rebuilds the snapshot from `catalog` and publishes it.
    ///
    /// On failure the previous snapshot stays current. A failing row-estimate
    /// query is logged and treated as "all estimates unknown".
    pub async fn load(&self, catalog: &dyn CatalogSource) -> EngineResult<usize> {
        let (names, columns, primary_keys, foreign_keys, estimates) = tokio::join!(
            catalog.table_names(),
            catalog.columns(),
            catalog.primary_keys(),
            catalog.foreign_keys(),
            catalog.row_estimates(),
        );

        let names = names.map_err(|e| refresh_error("tables", e))?;
        let columns = columns.map_err(|e| refresh_error("columns", e))?;
        let primary_keys = primary_keys.map_err(|e| refresh_error("primary keys", e))?;
        let foreign_keys = foreign_keys.map_err(|e| refresh_error("foreign keys", e))?;
        let estimates = estimates.unwrap_or_else(|e| {
            warn!(error = %e, "row estimates unavailable, continuing without them");
            Default::default()
        });

        let tables = assemble_tables(names, columns, primary_keys, foreign_keys, &estimates);
        let count = tables.len();
        let snapshot = Arc::new(SchemaSnapshot::new(tables, Utc::now()));

        *self.current.write() = snapshot;
        info!(tables = count, "schema cache refreshed");

        Ok(count)
    }

    /// Current snapshot; cheap to call and never blocks on a refresh.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn to_text(&self) -> String {
        self.snapshot().to_text()
    }

    pub fn table_count(&self) -> usize {
        self.current.read().tables.len()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.current.read().captured_at
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.current.read().table(name).is_some()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

fn refresh_error(stage: &str, err: EngineError) -> EngineError {
    EngineError::refresh_failed(format!("load {stage}: {err}"))
}
