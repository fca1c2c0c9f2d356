//! URI-level registry operations: register, load and format

use axum::{extract::State, http::StatusCode};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, FormatBody, FormatResponse, Json, LoadQuery, PromptVersionResponse, Query,
    RegisterBody,
};
use crate::infrastructure::services::RegisterPromptRequest;

/// POST /api/v1/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<PromptVersionResponse>), ApiError> {
    debug!(prompt = %body.name, "Registering prompt version");

    let details = state
        .prompt_service
        .register_prompt(RegisterPromptRequest {
            name: body.name,
            version: body.version.into(),
            description: body.description,
            prompt_tags: body.prompt_tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /api/v1/load?uri=prompts:/name/version
pub async fn load(
    State(state): State<AppState>,
    Query(query): Query<LoadQuery>,
) -> Result<Json<PromptVersionResponse>, ApiError> {
    let details = state
        .prompt_service
        .load_prompt(&query.uri)
        .await
        .map_err(|e| ApiError::from(e).with_param("uri"))?;

    Ok(Json(details.into()))
}

/// POST /api/v1/format
pub async fn format(
    State(state): State<AppState>,
    Json(body): Json<FormatBody>,
) -> Result<Json<FormatResponse>, ApiError> {
    let uri = body
        .uri
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing prompt URI").with_param("uri"))?;

    let result = state
        .prompt_service
        .format_prompt(uri, &body.variables, body.allow_partial)
        .await?;

    Ok(Json(result.into()))
}
