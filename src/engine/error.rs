// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for dbreader
//!
//! Driver, catalog and provider failures are all mapped onto this single
//! taxonomy so every error path ends in one structured response carrying a
//! short machine-checkable reason string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::safety::SafetyViolation;

/// Unified error type for all dbreader operations
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum EngineError {
    #[error("query is required")]
    EmptyQuery,

    #[error("only SELECT / CTE queries are allowed")]
    NotReadOnly,

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Query execution error: {message}")]
    ExecutionFailed { message: String },

    #[error("Failed to read row: {message}")]
    ScanFailed { message: String },

    #[error("Row cursor error: {message}")]
    CursorFailed { message: String },

    #[error("Failed to write export: {message}")]
    WriteFailed { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Schema refresh failed: {message}")]
    RefreshFailed { message: String },

    #[error("Query generation is not configured")]
    GenerationUnavailable,

    #[error("Generation provider error: {message}")]
    GenerationTransportFailed { message: String },

    #[error("Generation provider returned no usable content: {message}")]
    GenerationEmptyResponse { message: String },

    #[error("Generated query rejected: {violation}")]
    GeneratedQueryInvalid { violation: SafetyViolation },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed { message: msg.into() }
    }

    pub fn scan_failed(msg: impl Into<String>) -> Self {
        Self::ScanFailed { message: msg.into() }
    }

    pub fn cursor_failed(msg: impl Into<String>) -> Self {
        Self::CursorFailed { message: msg.into() }
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed { message: msg.into() }
    }

    pub fn refresh_failed(msg: impl Into<String>) -> Self {
        Self::RefreshFailed { message: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::GenerationTransportFailed { message: msg.into() }
    }

    pub fn empty_response(msg: impl Into<String>) -> Self {
        Self::GenerationEmptyResponse { message: msg.into() }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration { message: msg.into() }
    }

    /// Short, stable identifier for the failing rule or layer.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::NotReadOnly => "not_read_only",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::ScanFailed { .. } => "scan_failed",
            Self::CursorFailed { .. } => "cursor_failed",
            Self::WriteFailed { .. } => "write_failed",
            Self::Timeout { .. } => "timeout",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::GenerationUnavailable => "generation_unavailable",
            Self::GenerationTransportFailed { .. } => "generation_transport_failed",
            Self::GenerationEmptyResponse { .. } => "generation_empty_response",
            Self::GeneratedQueryInvalid { .. } => "generated_query_invalid",
            Self::Configuration { .. } => "configuration",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            reason: self.reason().to_string(),
        }
    }
}

impl From<SafetyViolation> for EngineError {
    fn from(violation: SafetyViolation) -> Self {
        match violation {
            SafetyViolation::EmptyQuery => Self::EmptyQuery,
            SafetyViolation::NotReadOnly => Self::NotReadOnly,
        }
    }
}

/// The single payload returned on every error path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: String,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
