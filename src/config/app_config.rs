use serde::Deserialize;

use crate::infrastructure::services::PromptServiceConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};
use crate::domain::DomainError;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    /// Table holding prompt documents
    pub table: String,
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// `[search]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_max_results: usize,
    pub max_results_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            table: "prompts".to_string(),
            postgres: PostgresSettings::default(),
        }
    }
}

impl Default for PostgresSettings {
    fn default() -> Self {
        let defaults = PostgresConfig::default();

        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
            min_connections: defaults.min_connections,
            connect_timeout_secs: defaults.connect_timeout_secs,
            idle_timeout_secs: defaults.idle_timeout_secs,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        let defaults = PromptServiceConfig::default();

        Self {
            default_max_results: defaults.default_max_results,
            max_results_limit: defaults.max_results_limit,
        }
    }
}

impl StorageSettings {
    /// Resolve the configured backend
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        match self.backend.parse::<StorageType>()? {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => Ok(StorageConfig::postgres(
                PostgresConfig::new(&self.postgres.url)
                    .with_max_connections(self.postgres.max_connections)
                    .with_min_connections(self.postgres.min_connections)
                    .with_connect_timeout(self.postgres.connect_timeout_secs)
                    .with_idle_timeout(self.postgres.idle_timeout_secs),
            )),
        }
    }
}

impl SearchSettings {
    pub fn to_service_config(&self) -> Result<PromptServiceConfig, DomainError> {
        if self.max_results_limit == 0 || self.default_max_results == 0 {
            return Err(DomainError::configuration(
                "search page sizes must be positive",
            ));
        }

        if self.default_max_results > self.max_results_limit {
            return Err(DomainError::configuration(format!(
                "search.default_max_results ({}) exceeds search.max_results_limit ({})",
                self.default_max_results, self.max_results_limit
            )));
        }

        Ok(PromptServiceConfig {
            default_max_results: self.default_max_results,
            max_results_limit: self.max_results_limit,
        })
    }
}

impl AppConfig {
    /// Load `config/default`, `config/local` and `APP__*` environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
