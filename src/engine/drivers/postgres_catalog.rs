// SPDX-License-Identifier: Apache-2.0

//! Catalog introspection for PostgreSQL (`public` schema, base tables only).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::drivers::postgres::PostgresDriver;
use crate::engine::error::{EngineError, EngineResult};
use crate::schema::catalog::CatalogSource;
use crate::schema::types::{Column, ForeignKey};

const TABLE_NAMES_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = 'public'
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.table_name::text,
        c.column_name::text,
        c.data_type::text,
        c.is_nullable = 'YES' AS nullable,
        COALESCE(pgd.description, '')::text AS comment
    FROM information_schema.columns c
    LEFT JOIN pg_catalog.pg_statio_all_tables st
        ON st.schemaname = c.table_schema AND st.relname = c.table_name
    LEFT JOIN pg_catalog.pg_description pgd
        ON pgd.objoid = st.relid AND pgd.objsubid = c.ordinal_position
    WHERE c.table_schema = 'public'
    ORDER BY c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
    SELECT
        tc.table_name::text,
        kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = 'public'
    ORDER BY tc.table_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        tc.table_name::text,
        kcu.column_name::text,
        ccu.table_name::text AS foreign_table,
        ccu.column_name::text AS foreign_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON tc.constraint_name = ccu.constraint_name
        AND tc.table_schema = ccu.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = 'public'
"#;

const ROW_ESTIMATES_SQL: &str = r#"
    SELECT relname::text, reltuples::bigint
    FROM pg_class
    WHERE relnamespace = 'public'::regnamespace
      AND relkind = 'r'
"#;

fn catalog_error(e: sqlx::Error) -> EngineError {
    EngineError::execution_failed(e.to_string())
}

#[async_trait]
impl CatalogSource for PostgresDriver {
    async fn table_names(&self) -> EngineResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(TABLE_NAMES_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(catalog_error)?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn columns(&self) -> EngineResult<HashMap<String, Vec<Column>>> {
        let rows: Vec<(String, String, String, bool, String)> = sqlx::query_as(COLUMNS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(catalog_error)?;

        let mut columns: HashMap<String, Vec<Column>> = HashMap::new();
        for (table, name, data_type, nullable, comment) in rows {
            columns
                .entry(table)
                .or_default()
                .push(Column::new(name, data_type, nullable).with_comment(comment));
        }
        Ok(columns)
    }

    async fn primary_keys(&self) -> EngineResult<HashMap<String, Vec<String>>> {
        let rows: Vec<(String, String)> = sqlx::query_as(PRIMARY_KEYS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(catalog_error)?;

        let mut keys: HashMap<String, Vec<String>> = HashMap::new();
        for (table, column) in rows {
            keys.entry(table).or_default().push(column);
        }
        Ok(keys)
    }

    async fn foreign_keys(&self) -> EngineResult<HashMap<String, Vec<ForeignKey>>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(catalog_error)?;

        let mut keys: HashMap<String, Vec<ForeignKey>> = HashMap::new();
        for (table, column, referenced_table, referenced_column) in rows {
            keys.entry(table).or_default().push(ForeignKey {
                column,
                referenced_table,
                referenced_column,
            });
        }
        Ok(keys)
    }

    async fn row_estimates(&self) -> EngineResult<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(ROW_ESTIMATES_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(catalog_error)?;

        Ok(rows.into_iter().collect())
    }
}
