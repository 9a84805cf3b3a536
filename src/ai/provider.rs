// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::parser::parse_response;
use super::prompt::build_instruction;
use super::types::{AiConfig, Completion, GenerationRequest, GenerationResponse};
use crate::engine::error::{EngineError, EngineResult};
use crate::observability::Sensitive;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─── Trait ───────────────────────────────────────────────────

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One non-streaming completion for a system instruction and a user turn.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32)
        -> EngineResult<Completion>;

    /// Builds the instruction from the request's schema text, asks for a
    /// completion and classifies the answer. The result is not validated.
    async fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationResponse> {
        let system = build_instruction(&request.schema);
        let completion = self
            .complete(&system, &request.prompt, request.effective_max_tokens())
            .await?;

        Ok(GenerationResponse {
            outcome: parse_response(&completion.text),
            tokens: completion.tokens,
        })
    }
}

fn http_client() -> EngineResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| EngineError::configuration(format!("HTTP client: {e}")))
}

/// Sends `body` and hands the status and raw text to `decode`.
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    decode: fn(u16, &str) -> EngineResult<Completion>,
) -> EngineResult<Completion> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| EngineError::transport(format!("request failed: {e}")))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| EngineError::transport(format!("failed to read response: {e}")))?;

    decode(status, &text)
}

// ─── OpenAI ──────────────────────────────────────────────────

pub struct OpenAiProvider {
    client: Client,
    api_key: Sensitive<String>,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig) -> EngineResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: config.api_key.clone(),
            model: config.effective_model(),
            base_url: config.effective_base_url(),
        })
    }

    pub fn request_body(model: &str, system: &str, user: &str, max_tokens: u32) -> Value {
        json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "max_completion_tokens": max_tokens,
            "temperature": 0
        })
    }

    pub fn decode_response(status: u16, body: &str) -> EngineResult<Completion> {
        let parsed = check_status(status, body)?;

        let choice = parsed["choices"]
            .get(0)
            .ok_or_else(|| EngineError::empty_response("no choices in response"))?;
        let text = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| EngineError::empty_response("choice has no message content"))?;

        let usage = &parsed["usage"];
        let tokens = usage["total_tokens"]
            .as_u64()
            .or_else(|| sum_tokens(usage, "prompt_tokens", "completion_tokens"));

        Ok(Completion {
            text: text.to_string(),
            tokens: tokens.map(saturate),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> EngineResult<Completion> {
        let body = Self::request_body(&self.model, system, user, max_tokens);
        debug!(model = %self.model, max_tokens, "OpenAI completion request");

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose());

        post_json(request, &body, Self::decode_response).await
    }
}

// ─── Anthropic ───────────────────────────────────────────────

pub struct AnthropicProvider {
    client: Client,
    api_key: Sensitive<String>,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(config: &AiConfig) -> EngineResult<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: config.api_key.clone(),
            model: config.effective_model(),
            base_url: config.effective_base_url(),
        })
    }

    pub fn request_body(model: &str, system: &str, user: &str, max_tokens: u32) -> Value {
        json!({
            "model": model,
            "system": system,
            "messages": [
                { "role": "user", "content": user }
            ],
            "max_tokens": max_tokens
        })
    }

    pub fn decode_response(status: u16, body: &str) -> EngineResult<Completion> {
        let parsed = check_status(status, body)?;

        let text = parsed["content"]
            .as_array()
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b["type"].as_str() == Some("text"))
                    .and_then(|b| b["text"].as_str())
            })
            .ok_or_else(|| EngineError::empty_response("no text block in response"))?;

        let tokens = sum_tokens(&parsed["usage"], "input_tokens", "output_tokens");

        Ok(Completion {
            text: text.to_string(),
            tokens: tokens.map(saturate),
        })
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> EngineResult<Completion> {
        let body = Self::request_body(&self.model, system, user, max_tokens);
        debug!(model = %self.model, max_tokens, "Anthropic completion request");

        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION);

        post_json(request, &body, Self::decode_response).await
    }
}

// ─── Scripted ────────────────────────────────────────────────

/// Provider that answers every call with a fixed completion.
///
/// Records the last system/user pair it was given. Used to drive the
/// orchestrator without a network.
pub struct ScriptedProvider {
    answer: EngineResult<Completion>,
    last_call: Mutex<Option<(String, String)>>,
}

impl ScriptedProvider {
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            answer: Ok(Completion {
                text: text.into(),
                tokens: None,
            }),
            last_call: Mutex::new(None),
        }
    }

    pub fn failing(error: EngineError) -> Self {
        Self {
            answer: Err(error),
            last_call: Mutex::new(None),
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        if let Ok(c) = &mut self.answer {
            c.tokens = Some(tokens);
        }
        self
    }

    /// `(system, user)` of the most recent call
    pub fn last_call(&self) -> Option<(String, String)> {
        self.last_call.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        _max_tokens: u32,
    ) -> EngineResult<Completion> {
        *self.last_call.lock() = Some((system.to_string(), user.to_string()));
        self.answer.clone()
    }
}

// ─── Helpers ─────────────────────────────────────────────────

/// Maps non-2xx statuses to transport errors and parses the body.
fn check_status(status: u16, body: &str) -> EngineResult<Value> {
    if !(200..300).contains(&status) {
        let msg = extract_api_error(body).unwrap_or_else(|| format!("status {status}"));
        return Err(EngineError::transport(msg));
    }

    serde_json::from_str(body)
        .map_err(|e| EngineError::transport(format!("invalid response body: {e}")))
}

/// Pull `error.message` out of an API error body.
fn extract_api_error(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed["error"]["message"].as_str().map(|s| s.to_string())
}

fn sum_tokens(usage: &Value, a: &str, b: &str) -> Option<u64> {
    match (usage[a].as_u64(), usage[b].as_u64()) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(0) + y.unwrap_or(0)),
    }
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
