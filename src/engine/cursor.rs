// SPDX-License-Identifier: Apache-2.0

//! Row cursor abstraction
//!
//! A cursor owns whatever resources back the result stream (a pooled
//! connection, a server-side portal). Dropping it releases them, so every
//! exit path of a consumer, including `?` on a scan error, closes the cursor.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::NativeValue;

#[async_trait]
pub trait RowCursor: Send {
    /// Column names in result order, known before the first row is read
    fn columns(&self) -> &[String];

    /// Next row, or `None` once the cursor is exhausted
    async fn next_row(&mut self) -> EngineResult<Option<Vec<NativeValue>>>;
}

/// Cursor over rows already held in memory
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<NativeValue>>,
    fail_after: Option<usize>,
    served: usize,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<NativeValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            fail_after: None,
            served: 0,
        }
    }

    /// Make the cursor fail with `ScanFailed` once `rows` rows have been read.
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    /// Rows not yet handed out
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> EngineResult<Option<Vec<NativeValue>>> {
        if self.fail_after == Some(self.served) {
            return Err(EngineError::scan_failed(format!(
                "row {} could not be decoded",
                self.served
            )));
        }

        let row = self.rows.pop_front();
        if row.is_some() {
            self.served += 1;
        }
        Ok(row)
    }
}
