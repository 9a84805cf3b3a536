// SPDX-License-Identifier: Apache-2.0

// dbreader - read-only SQL runner with schema-grounded query generation
// Core library

pub mod ai;
pub mod config;
pub mod engine;
pub mod export;
pub mod observability;
pub mod schema;
pub mod service;

use std::sync::Arc;

use tracing::{info, warn};

use ai::build_provider;
use config::ReaderConfig;
use engine::drivers::postgres::PostgresDriver;
use engine::EngineResult;
use schema::SchemaCache;
use service::ReaderService;

/// Example query used when the caller does not supply one
pub const DEFAULT_QUERY: &str = "SELECT 1 AS id, 'hello' AS greeting;";

pub struct AppState {
    pub driver: Arc<PostgresDriver>,
    pub service: ReaderService,
}

impl AppState {
    /// Connects the pool and builds the provider with an empty schema cache.
    pub async fn connect(config: &ReaderConfig) -> EngineResult<Self> {
        let driver = Arc::new(PostgresDriver::connect(&config.database).await?);

        let provider = match &config.ai {
            Some(ai) => Some(build_provider(ai)?),
            None => {
                info!("LLM_API_KEY not set, query generation disabled");
                None
            }
        };

        let schema = Arc::new(SchemaCache::new());
        let service = ReaderService::new(driver.clone(), schema, provider);

        Ok(Self { driver, service })
    }

    /// A failed load is logged and tolerated: generation runs against
    /// whatever snapshot is current.
    pub async fn load_initial_schema(&self) {
        match self.refresh_schema().await {
            Ok(tables) => info!(tables, "initial schema loaded"),
            Err(e) => warn!(error = %e, reason = e.reason(), "initial schema load failed"),
        }
    }

    pub async fn refresh_schema(&self) -> EngineResult<usize> {
        self.service.refresh_schema(&*self.driver).await
    }
}
