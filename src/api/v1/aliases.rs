//! Alias endpoints

use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::types::{ApiError, DeletedResponse, Json, PromptVersionResponse, SetAliasBody};

/// GET /api/v1/prompts/{name}/aliases/{alias}
///
/// Resolves the alias; `latest` always resolves to the newest version.
pub async fn get_alias(
    State(state): State<AppState>,
    Path((name, alias)): Path<(String, String)>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let details = state
        .prompt_service
        .get_prompt_version_by_alias(&name, &alias)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Alias '{}' not found for prompt '{}'", alias, name))
        })?;

    Ok(Json(details.into()))
}

/// PUT /api/v1/prompts/{name}/aliases/{alias}
pub async fn set_alias(
    State(state): State<AppState>,
    Path((name, alias)): Path<(String, String)>,
    Json(body): Json<SetAliasBody>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let details = state
        .prompt_service
        .set_prompt_alias(&name, &alias, body.version)
        .await?;

    Ok(Json(details.into()))
}

/// DELETE /api/v1/prompts/{name}/aliases/{alias}
pub async fn delete_alias(
    State(state): State<AppState>,
    Path((name, alias)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.prompt_service.delete_prompt_alias(&name, &alias).await?;

    Ok(Json(DeletedResponse { deleted: true }))
}
