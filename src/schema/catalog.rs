// SPDX-License-Identifier: Apache-2.0

//! Catalog introspection seam and snapshot assembly.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::error::{EngineError, EngineResult};
use crate::schema::types::{Column, ForeignKey, Table};

/// The five structural queries a schema refresh needs.
///
/// Column, primary-key and foreign-key maps are keyed by table name.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Base table names, sorted
    async fn table_names(&self) -> EngineResult<Vec<String>>;

    /// Columns per table in ordinal order; `is_primary_key` is ignored
    async fn columns(&self) -> EngineResult<HashMap<String, Vec<Column>>>;

    async fn primary_keys(&self) -> EngineResult<HashMap<String, Vec<String>>>;

    async fn foreign_keys(&self) -> EngineResult<HashMap<String, Vec<ForeignKey>>>;

    /// Planner row estimates; may be negative for never-analyzed tables
    async fn row_estimates(&self) -> EngineResult<HashMap<String, i64>>;
}

/// Join the per-query maps into tables, in `names` order.
pub fn assemble_tables(
    names: Vec<String>,
    mut columns: HashMap<String, Vec<Column>>,
    primary_keys: HashMap<String, Vec<String>>,
    mut foreign_keys: HashMap<String, Vec<ForeignKey>>,
    row_estimates: &HashMap<String, i64>,
) -> Vec<Table> {
    names
        .into_iter()
        .map(|name| {
            let pk_cols = primary_keys.get(&name).map(Vec::as_slice).unwrap_or(&[]);
            let columns = columns
                .remove(&name)
                .unwrap_or_default()
                .into_iter()
                .map(|mut col| {
                    col.is_primary_key = pk_cols.iter().any(|pk| *pk == col.name);
                    col
                })
                .collect();

            Table {
                foreign_keys: foreign_keys.remove(&name).unwrap_or_default(),
                row_estimate: row_estimates.get(&name).copied().unwrap_or(0).max(0) as u64,
                columns,
                name,
            }
        })
        .collect()
}

/// Which catalog query a `StaticCatalog` should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery {
    TableNames,
    Columns,
    PrimaryKeys,
    ForeignKeys,
    RowEstimates,
}

/// In-memory catalog built from finished tables
///
/// Useful for tests and for seeding a cache without a live database.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: Vec<Table>,
    failing: Vec<CatalogQuery>,
}

impl StaticCatalog {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables,
            failing: Vec::new(),
        }
    }

    pub fn failing(mut self, query: CatalogQuery) -> Self {
        self.failing.push(query);
        self
    }

    fn check(&self, query: CatalogQuery) -> EngineResult<()> {
        if self.failing.contains(&query) {
            return Err(EngineError::execution_failed(format!(
                "catalog query {query:?} failed"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn table_names(&self) -> EngineResult<Vec<String>> {
        self.check(CatalogQuery::TableNames)?;
        let mut names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn columns(&self) -> EngineResult<HashMap<String, Vec<Column>>> {
        self.check(CatalogQuery::Columns)?;
        Ok(self
            .tables
            .iter()
            .map(|t| {
                let cols = t
                    .columns
                    .iter()
                    .cloned()
                    .map(|mut c| {
                        c.is_primary_key = false;
                        c
                    })
                    .collect();
                (t.name.clone(), cols)
            })
            .collect())
    }

    async fn primary_keys(&self) -> EngineResult<HashMap<String, Vec<String>>> {
        self.check(CatalogQuery::PrimaryKeys)?;
        Ok(self
            .tables
            .iter()
            .map(|t| {
                let pks = t
                    .columns
                    .iter()
                    .filter(|c| c.is_primary_key)
                    .map(|c| c.name.clone())
                    .collect();
                (t.name.clone(), pks)
            })
            .collect())
    }

    async fn foreign_keys(&self) -> EngineResult<HashMap<String, Vec<ForeignKey>>> {
        self.check(CatalogQuery::ForeignKeys)?;
        Ok(self
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.foreign_keys.clone()))
            .collect())
    }

    async fn row_estimates(&self) -> EngineResult<HashMap<String, i64>> {
        self.check(CatalogQuery::RowEstimates)?;
        Ok(self
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.row_estimate as i64))
            .collect())
    }
}
