// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Outcome of a completed CSV export
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows_exported: u64,
    pub bytes_written: u64,
    pub elapsed_ms: u64,
}
