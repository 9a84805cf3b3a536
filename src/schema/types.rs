// SPDX-License-Identifier: Apache-2.0

//! Structural snapshot of the database and its text rendering.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendered in place of table blocks when the snapshot is empty
pub const NO_TABLES_SENTINEL: &str = "(no tables found)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Declared type as reported by the source dialect
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    /// Empty when the column has no comment
    pub comment: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            is_primary_key: false,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Directed edge `column -> referenced_table.referenced_column`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// Introspection order
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Approximate row count, 0 when unknown
    pub row_estimate: u64,
}

/// Immutable point-in-time description of the database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaSnapshot {
    /// Sorted by name
    pub tables: Vec<Table>,
    /// `None` until the first successful load
    pub captured_at: Option<DateTime<Utc>>,
}

impl SchemaSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(tables: Vec<Table>, captured_at: DateTime<Utc>) -> Self {
        Self {
            tables,
            captured_at: Some(captured_at),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Deterministic text form used as prompt context.
    pub fn to_text(&self) -> String {
        if self.tables.is_empty() {
            return NO_TABLES_SENTINEL.to_string();
        }

        self.tables
            .iter()
            .map(format_table)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format a single table into its text block (ends with a newline)
fn format_table(table: &Table) -> String {
    let mut out = String::new();
    let _ = write!(out, "TABLE: {}", table.name);
    if table.row_estimate > 0 {
        let _ = write!(out, " (~{} rows)", table.row_estimate);
    }
    out.push('\n');

    for col in &table.columns {
        let _ = write!(out, "  - {}: {}", col.name, col.data_type);

        let mut attrs = Vec::new();
        if col.is_primary_key {
            attrs.push("PK");
        }
        if !col.nullable {
            attrs.push("NOT NULL");
        }
        if !attrs.is_empty() {
            let _ = write!(out, ", {}", attrs.join(", "));
        }

        if let Some(fk) = table.foreign_keys.iter().find(|fk| fk.column == col.name) {
            let _ = write!(out, " -> {}.{}", fk.referenced_table, fk.referenced_column);
        }

        if !col.comment.is_empty() {
            let _ = write!(out, " // {}", col.comment);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_schema() -> SchemaSnapshot {
        let mut id = Column::new("id", "integer", false);
        id.is_primary_key = true;

        let customers = Table {
            name: "customers".into(),
            columns: vec![id.clone(), Column::new("email", "text", true)],
            foreign_keys: vec![],
            row_estimate: 1200,
        };
        let orders = Table {
            name: "orders".into(),
            columns: vec![
                id,
                Column::new("customer_id", "integer", false).with_comment("buyer"),
                Column::new("total", "numeric", true),
            ],
            foreign_keys: vec![ForeignKey {
                column: "customer_id".into(),
                referenced_table: "customers".into(),
                referenced_column: "id".into(),
            }],
            row_estimate: 0,
        };

        SchemaSnapshot::new(vec![customers, orders], Utc::now())
    }

    #[test]
    fn test_to_text_layout() {
        let text = orders_schema().to_text();

        assert_eq!(
            text,
            "TABLE: customers (~1200 rows)\n\
             \x20 - id: integer, PK, NOT NULL\n\
             \x20 - email: text\n\
             \n\
             TABLE: orders\n\
             \x20 - id: integer, PK, NOT NULL\n\
             \x20 - customer_id: integer, NOT NULL -> customers.id // buyer\n\
             \x20 - total: numeric\n"
        );
    }

    #[test]
    fn test_to_text_is_stable() {
        let snapshot = orders_schema();
        assert_eq!(snapshot.to_text(), snapshot.to_text());
    }

    #[test]
    fn test_empty_snapshot_sentinel() {
        assert_eq!(SchemaSnapshot::empty().to_text(), NO_TABLES_SENTINEL);
    }

    #[test]
    fn test_table_lookup_ignores_case() {
        let snapshot = orders_schema();
        assert!(snapshot.table("ORDERS").is_some());
        assert!(snapshot.table("invoices").is_none());
    }
}
