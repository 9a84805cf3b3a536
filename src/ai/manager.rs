// SPDX-License-Identifier: Apache-2.0

//! Provider construction from configuration.

use std::sync::Arc;

use tracing::info;

use super::provider::{AnthropicProvider, GenerationProvider, OpenAiProvider};
use super::types::{AiConfig, AiProvider};
use crate::engine::error::{EngineError, EngineResult};

/// Builds the backend named by `config.provider`.
///
/// An empty API key is rejected here rather than on the first request.
pub fn build_provider(config: &AiConfig) -> EngineResult<Arc<dyn GenerationProvider>> {
    if config.api_key.expose().trim().is_empty() {
        return Err(EngineError::configuration(format!(
            "{} requires an API key",
            config.provider.as_str()
        )));
    }

    let provider: Arc<dyn GenerationProvider> = match config.provider {
        AiProvider::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        AiProvider::Anthropic => Arc::new(AnthropicProvider::new(config)?),
    };

    info!(
        provider = provider.name(),
        model = %config.effective_model(),
        base_url = %config.effective_base_url(),
        "generation provider configured"
    );

    Ok(provider)
}
