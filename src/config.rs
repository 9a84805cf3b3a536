// SPDX-License-Identifier: Apache-2.0

//! Process configuration read from the environment (and `.env` if present).

use crate::ai::types::{AiConfig, AiProvider};
use crate::engine::error::{EngineError, EngineResult};
use crate::observability::Sensitive;

pub const DEFAULT_DSN: &str = "postgres://localhost/postgres?sslmode=disable";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Connection settings for the read-only pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub dsn: Sensitive<String>,
    pub max_connections: u32,
    /// Start every session with `default_transaction_read_only=on`
    pub read_only: bool,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: Sensitive::new(DEFAULT_DSN.to_string()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_only: true,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub database: DatabaseConfig,
    /// `None` disables query generation
    pub ai: Option<AiConfig>,
}

impl ReaderConfig {
    /// Loads `.env` from the working directory, then reads the process
    /// environment.
    pub fn from_env() -> EngineResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = DatabaseConfig {
            dsn: Sensitive::new(get("DB_DSN").unwrap_or_else(|| DEFAULT_DSN.to_string())),
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?,
            read_only: parse_bool("DB_READ_ONLY", get("DB_READ_ONLY"), true)?,
            acquire_timeout_secs: parse_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                get("DB_ACQUIRE_TIMEOUT_SECS"),
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
        };

        if database.max_connections == 0 {
            return Err(EngineError::configuration("DB_MAX_CONNECTIONS must be at least 1"));
        }

        let ai = match get("LLM_API_KEY") {
            Some(key) => Some(AiConfig {
                provider: get("LLM_PROVIDER").unwrap_or_default().parse::<AiProvider>()?,
                api_key: Sensitive::new(key),
                model: get("LLM_MODEL"),
                base_url: get("LLM_BASE_URL"),
            }),
            None => None,
        };

        Ok(Self { database, ai })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> EngineResult<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| EngineError::configuration(format!("{key}: invalid value {v:?}"))),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> EngineResult<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(EngineError::configuration(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> EngineResult<ReaderConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReaderConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.database.dsn.expose(), DEFAULT_DSN);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.read_only);
        assert!(config.ai.is_none());
    }

    #[test]
    fn test_ai_enabled_by_key() {
        let config = load(&[
            ("LLM_API_KEY", "sk-ant-xyz"),
            ("LLM_PROVIDER", "anthropic"),
            ("LLM_MODEL", " claude-test "),
            ("LLM_BASE_URL", ""),
        ])
        .unwrap();

        let ai = config.ai.unwrap();
        assert_eq!(ai.provider, AiProvider::Anthropic);
        assert_eq!(ai.api_key.expose(), "sk-ant-xyz");
        assert_eq!(ai.model.as_deref(), Some("claude-test"));
        assert!(ai.base_url.is_none());
    }

    #[test]
    fn test_provider_defaults_to_openai() {
        let ai = load(&[("LLM_API_KEY", "sk")]).unwrap().ai.unwrap();
        assert_eq!(ai.provider, AiProvider::OpenAi);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for vars in [
            vec![("DB_MAX_CONNECTIONS", "lots")],
            vec![("DB_MAX_CONNECTIONS", "0")],
            vec![("DB_READ_ONLY", "maybe")],
            vec![("LLM_API_KEY", "k"), ("LLM_PROVIDER", "bard")],
        ] {
            let err = load(&vars).unwrap_err();
            assert_eq!(err.reason(), "configuration", "{vars:?}");
        }
    }

    #[test]
    fn test_dsn_not_leaked_by_debug() {
        let config = load(&[("DB_DSN", "postgres://u:secret@h/db")]).unwrap();
        assert!(!format!("{config:?}").contains("secret"));
    }
}
