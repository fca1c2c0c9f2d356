//! Version endpoints: the template store of a prompt

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateVersionBody, DeletedResponse, FormatBody, FormatResponse, Json, PageResponse,
    PromptVersionResponse, Query, TagValueBody, VersionListQuery,
};
use crate::domain::prompt::parse_version;
use crate::domain::DomainError;

/// Version path segments arrive as text so bad numbers map to a validation error
pub(super) fn version_param(raw: &str) -> Result<u32, ApiError> {
    parse_version(raw)
        .map_err(DomainError::from)
        .map_err(|e| ApiError::from(e).with_param("version"))
}

/// GET /api/v1/prompts/{name}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<VersionListQuery>,
) -> Result<Json<PageResponse<PromptVersionResponse>>, ApiError> {
    debug!(prompt = %name, "Listing prompt versions");

    let page = state
        .prompt_service
        .search_prompt_versions(&name, query.max_results, query.page_token.as_deref())
        .await?;

    Ok(Json(page.into()))
}

/// POST /api/v1/prompts/{name}/versions
pub async fn create_version(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<CreateVersionBody>,
) -> Result<(StatusCode, Json<PromptVersionResponse>), ApiError> {
    let details = state
        .prompt_service
        .create_prompt_version(&name, body.into())
        .await?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /api/v1/prompts/{name}/versions/{version}
pub async fn get_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let version = version_param(&version)?;

    let details = state
        .prompt_service
        .get_prompt_version(&name, version)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Version {} of prompt '{}' not found", version, name))
        })?;

    Ok(Json(details.into()))
}

/// DELETE /api/v1/prompts/{name}/versions/{version}
pub async fn delete_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let version = version_param(&version)?;
    state
        .prompt_service
        .delete_prompt_version(&name, version)
        .await?;

    Ok(Json(DeletedResponse { deleted: true }))
}

/// PUT /api/v1/prompts/{name}/versions/{version}/tags/{key}
pub async fn set_version_tag(
    State(state): State<AppState>,
    Path((name, version, key)): Path<(String, String, String)>,
    Json(body): Json<TagValueBody>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let version = version_param(&version)?;
    let details = state
        .prompt_service
        .set_prompt_version_tag(&name, version, &key, &body.value)
        .await?;

    Ok(Json(details.into()))
}

/// DELETE /api/v1/prompts/{name}/versions/{version}/tags/{key}
pub async fn delete_version_tag(
    State(state): State<AppState>,
    Path((name, version, key)): Path<(String, String, String)>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let version = version_param(&version)?;
    let details = state
        .prompt_service
        .delete_prompt_version_tag(&name, version, &key)
        .await?;

    Ok(Json(details.into()))
}

/// POST /api/v1/prompts/{name}/versions/{version}/format
pub async fn format_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    Json(body): Json<FormatBody>,
) -> Result<Json<FormatResponse>, ApiError> {
    let version = version_param(&version)?;
    let result = state
        .prompt_service
        .format_prompt_version(&name, version, &body.variables, body.allow_partial)
        .await?;

    Ok(Json(result.into()))
}
