//! Format command - renders a stored prompt from the configured storage

use std::collections::HashMap;

use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;
use crate::domain::prompt::FormattedPrompt;
use crate::domain::DomainError;
use crate::infrastructure::storage::StorageType;

#[derive(Args, Clone, Debug)]
pub struct FormatArgs {
    /// Prompt URI: `prompts:/<name>/<version>` or `prompts:/<name>@<alias>`
    pub uri: String,

    /// Variable value as `key=value`; repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Leave placeholders without a value in place
    #[arg(long)]
    pub allow_partial: bool,
}

pub async fn run(args: FormatArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    require_persistent_storage(&config)?;
    let state = crate::create_app_state_with_config(&config).await?;

    let values: HashMap<String, String> = args.vars.into_iter().collect();
    let result = state
        .prompt_service
        .format_prompt(&args.uri, &values, args.allow_partial)
        .await
        .with_context(|| format!("Failed to format {}", args.uri))?;

    println!("{}", render(&result.formatted)?);

    Ok(())
}

/// An in-memory store is empty in a fresh process, so nothing could resolve
fn require_persistent_storage(config: &AppConfig) -> Result<(), DomainError> {
    match config.storage.to_storage_config()?.storage_type() {
        StorageType::InMemory => Err(DomainError::configuration(
            "format requires a persistent storage backend (postgres)",
        )),
        StorageType::Postgres => Ok(()),
    }
}

/// Text prints verbatim; chat messages print as pretty JSON
fn render(formatted: &FormattedPrompt) -> anyhow::Result<String> {
    match formatted {
        FormattedPrompt::Text(text) => Ok(text.clone()),
        FormattedPrompt::Chat(messages) => Ok(serde_json::to_string_pretty(messages)?),
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    if key.trim().is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }

    Ok((key.trim().to_string(), value.to_string()))
}
