// SPDX-License-Identifier: Apache-2.0

//! Read-only gate for ad-hoc and generated SQL.
//!
//! This is a lexical prefix check, not a parser. It only looks at the start of
//! the trimmed text, so it does not notice statement chaining
//! (`SELECT 1; DROP TABLE t`), comments hiding a second statement, or
//! payloads that merely begin with a `SELECT`/`WITH` token. The database
//! credential used for execution must be read-only; that is the real
//! enforcement boundary. Do not grow this into a SQL parser: callers rely on
//! its exact accept/reject behavior.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule that rejected a query
#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyViolation {
    #[error("query is required")]
    EmptyQuery,

    #[error("only SELECT / CTE queries are allowed")]
    NotReadOnly,
}

const READ_ONLY_PREFIXES: [&str; 2] = ["select", "with"];

/// Returns the trimmed query if it starts with `SELECT` or `WITH`
/// (case-insensitive).
pub fn validate_read_only(raw: &str) -> Result<String, SafetyViolation> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(SafetyViolation::EmptyQuery);
    }

    let accepted = READ_ONLY_PREFIXES.iter().any(|prefix| {
        query
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    });

    if accepted {
        Ok(query.to_string())
    } else {
        Err(SafetyViolation::NotReadOnly)
    }
}
