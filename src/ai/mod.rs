// SPDX-License-Identifier: Apache-2.0

//! Natural-language query generation
//!
//! Builds a schema-grounded instruction, sends it to an OpenAI- or
//! Anthropic-style backend and classifies the answer. Validation of the
//! generated text happens in the service, not here.

pub mod manager;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod types;

pub use manager::build_provider;
pub use provider::GenerationProvider;
pub use types::{AiConfig, AiProvider, GenerationOutcome, GenerationRequest, GenerationResponse};
