// SPDX-License-Identifier: Apache-2.0

//! Reader service
//!
//! Composes the safety gate, the query engine, the schema cache and the
//! generation provider. Every outbound call runs under a fixed deadline and
//! is attempted exactly once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::ai::parser::parse_discovery;
use crate::ai::prompt::{build_discovery_instruction, DISCOVERY_USER_PROMPT};
use crate::ai::provider::GenerationProvider;
use crate::ai::types::{GenerationOutcome, GenerationRequest, QuestionCategory, DEFAULT_MAX_TOKENS};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::safety::validate_read_only;
use crate::engine::traits::{ExportSink, QueryEngine};
use crate::engine::types::{clamp_limit, QueryResult};
use crate::export::types::ExportSummary;
use crate::schema::{CatalogSource, SchemaCache};

pub const QUERY_TIMEOUT: Duration = Duration::from_secs(8);
pub const SCHEMA_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

const DISCOVERY_MAX_TOKENS: u32 = DEFAULT_MAX_TOKENS * 2;

/// Deadlines applied by [`ReaderService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Query execution and CSV export
    pub query: Duration,
    pub schema_refresh: Duration,
    pub generation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: QUERY_TIMEOUT,
            schema_refresh: SCHEMA_REFRESH_TIMEOUT,
            generation: GENERATION_TIMEOUT,
        }
    }
}

/// Terminal outcome of a successful generation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeneratedQuery {
    /// Passed the safety gate; eligible for execution
    Candidate { query: String, tokens: Option<u32> },
    /// The schema cannot answer the request
    Missing { explanation: String, tokens: Option<u32> },
}

impl GeneratedQuery {
    pub fn query(&self) -> Option<&str> {
        match self {
            GeneratedQuery::Candidate { query, .. } => Some(query),
            GeneratedQuery::Missing { .. } => None,
        }
    }

    pub fn tokens(&self) -> Option<u32> {
        match self {
            GeneratedQuery::Candidate { tokens, .. } | GeneratedQuery::Missing { tokens, .. } => {
                *tokens
            }
        }
    }
}

pub struct ReaderService {
    engine: Arc<dyn QueryEngine>,
    schema: Arc<SchemaCache>,
    provider: Option<Arc<dyn GenerationProvider>>,
    timeouts: Timeouts,
}

impl ReaderService {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        schema: Arc<SchemaCache>,
        provider: Option<Arc<dyn GenerationProvider>>,
    ) -> Self {
        Self {
            engine,
            schema,
            provider,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    pub fn generation_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Validates and runs a user query, returning at most the clamped limit.
    #[instrument(skip(self, text), fields(request_id = %Uuid::new_v4()))]
    pub async fn execute_query(&self, text: &str, limit: i64) -> EngineResult<QueryResult> {
        let query = validate_read_only(text)?;
        let limit = clamp_limit(limit);

        let result = with_deadline(
            self.timeouts.query,
            self.engine.execute_bounded(&query, limit),
        )
        .await?;

        debug!(rows = result.count, more = result.more, "query finished");
        Ok(result)
    }

    /// Validates a user query and streams all of its rows to `sink` as CSV.
    #[instrument(skip(self, text, sink), fields(request_id = %Uuid::new_v4()))]
    pub async fn export_csv(&self, text: &str, sink: ExportSink<'_>) -> EngineResult<ExportSummary> {
        let query = validate_read_only(text)?;

        let summary = with_deadline(self.timeouts.query, self.engine.export_csv(&query, sink)).await?;

        info!(rows = summary.rows_exported, bytes = summary.bytes_written, "export finished");
        Ok(summary)
    }

    /// Turns a natural-language request into a validated candidate query.
    ///
    /// A missing-capability answer is returned as-is. A candidate that fails
    /// the safety gate becomes `GeneratedQueryInvalid`, never a candidate.
    #[instrument(skip(self, prompt), fields(request_id = %Uuid::new_v4()))]
    pub async fn generate_query(&self, prompt: &str) -> EngineResult<GeneratedQuery> {
        let provider = self.provider.as_ref().ok_or(EngineError::GenerationUnavailable)?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            schema: self.schema.to_text(),
            max_tokens: None,
        };
        let response = with_deadline(self.timeouts.generation, provider.generate(&request)).await?;
        let tokens = response.tokens;

        match response.outcome {
            GenerationOutcome::Missing(explanation) => {
                info!(provider = provider.name(), "schema cannot answer request");
                Ok(GeneratedQuery::Missing { explanation, tokens })
            }
            GenerationOutcome::Query(candidate) => match validate_read_only(&candidate) {
                Ok(query) => {
                    info!(provider = provider.name(), ?tokens, "candidate query accepted");
                    Ok(GeneratedQuery::Candidate { query, tokens })
                }
                Err(violation) => {
                    warn!(provider = provider.name(), %violation, "generated query rejected");
                    Err(EngineError::GeneratedQueryInvalid { violation })
                }
            },
        }
    }

    /// Asks the provider for example questions grouped by domain.
    #[instrument(skip(self), fields(request_id = %Uuid::new_v4()))]
    pub async fn suggest_questions(&self) -> EngineResult<Vec<QuestionCategory>> {
        let provider = self.provider.as_ref().ok_or(EngineError::GenerationUnavailable)?;

        let system = build_discovery_instruction(&self.schema.to_text());
        let completion = with_deadline(
            self.timeouts.generation,
            provider.complete(&system, DISCOVERY_USER_PROMPT, DISCOVERY_MAX_TOKENS),
        )
        .await?;

        parse_discovery(&completion.text)
    }

    /// Reloads the schema cache. On failure or timeout the previous snapshot
    /// stays current.
    #[instrument(skip(self, catalog))]
    pub async fn refresh_schema(&self, catalog: &dyn CatalogSource) -> EngineResult<usize> {
        with_deadline(self.timeouts.schema_refresh, self.schema.load(catalog)).await
    }
}

/// Runs `fut` to completion or drops it once `limit` elapses.
async fn with_deadline<T, F>(limit: Duration, fut: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
