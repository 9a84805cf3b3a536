// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;
use crate::observability::Sensitive;

/// Token cap applied when a request does not set one
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Supported generation backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o",
            AiProvider::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "https://api.openai.com/v1",
            AiProvider::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

impl FromStr for AiProvider {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(EngineError::configuration(format!(
                "unknown LLM provider: {other:?} (supported: openai, anthropic)"
            ))),
        }
    }
}

/// Provider selection and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Sensitive<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl AiConfig {
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Input for query generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language request from the user
    pub prompt: String,
    /// Schema text from `SchemaCache::to_text`
    pub schema: String,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn effective_max_tokens(&self) -> u32 {
        match self.max_tokens {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_TOKENS,
        }
    }
}

/// Raw text returned by a provider, before parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens: Option<u32>,
}

/// What the model produced: a candidate query or a missing-capability note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Query(String),
    Missing(String),
}

/// Parsed provider result with token usage attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResponse {
    pub outcome: GenerationOutcome,
    pub tokens: Option<u32>,
}

/// One group of example questions produced by the discovery prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionCategory {
    pub domain: String,
    pub description: String,
    pub questions: Vec<String>,
}
