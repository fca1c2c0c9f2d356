//! Prompt registry
//!
//! Version control for prompt templates:
//! - Named prompts with immutable, monotonically numbered versions
//! - Aliases pointing at versions, with `latest` resolving to the newest
//! - `prompts:/name/version` and `prompts:/name@alias` URIs
//! - Text and chat templates with `{{ variable }}` placeholders
//! - Filtered, ordered and paginated search

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::Prompt;
use infrastructure::services::PromptService;
use infrastructure::storage::StorageFactory;

/// Build application state from configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_config = config.storage.to_storage_config()?;
    let service_config = config.search.to_service_config()?;

    let storage = StorageFactory::create::<Prompt>(&storage_config, &config.storage.table).await?;
    let prompt_service = PromptService::with_config(storage, service_config);

    info!(
        backend = ?storage_config.storage_type(),
        table = %config.storage.table,
        "Prompt registry initialized"
    );

    Ok(AppState::new(Arc::new(prompt_service)))
}

/// In-memory application state with default settings
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}
