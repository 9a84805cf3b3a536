// SPDX-License-Identifier: Apache-2.0

//! Streaming CSV export.

pub mod csv;
pub mod types;

pub use types::ExportSummary;
