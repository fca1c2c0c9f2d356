//! Prompt endpoints: search, CRUD and prompt tags

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreatePromptBody, DeletedResponse, Json, PageResponse, PromptResponse, Query,
    SearchQuery, TagValueBody, UpdatePromptBody,
};
use crate::infrastructure::services::{CreatePromptRequest, SearchPromptsRequest};

/// GET /api/v1/prompts
pub async fn search_prompts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PageResponse<PromptResponse>>, ApiError> {
    debug!(filter = ?query.filter, "Searching prompts");

    let order_by = query.order_by_clauses();
    let page = state
        .prompt_service
        .search_prompts(SearchPromptsRequest {
            filter: query.filter,
            max_results: query.max_results,
            order_by,
            page_token: query.page_token,
        })
        .await?;

    Ok(Json(page.into()))
}

/// POST /api/v1/prompts
pub async fn create_prompt(
    State(state): State<AppState>,
    Json(body): Json<CreatePromptBody>,
) -> Result<(StatusCode, Json<PromptResponse>), ApiError> {
    debug!(prompt = %body.name, "Creating prompt");

    let prompt = state
        .prompt_service
        .create_prompt(CreatePromptRequest {
            name: body.name,
            description: body.description,
            tags: body.tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PromptResponse::from(&prompt))))
}

/// GET /api/v1/prompts/{name}
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = state.prompt_service.get_prompt_required(&name).await?;

    Ok(Json(PromptResponse::from(&prompt)))
}

/// PATCH /api/v1/prompts/{name}
pub async fn update_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<UpdatePromptBody>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = state
        .prompt_service
        .update_prompt(&name, body.description)
        .await?;

    Ok(Json(PromptResponse::from(&prompt)))
}

/// DELETE /api/v1/prompts/{name}
pub async fn delete_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.prompt_service.delete_prompt(&name).await?;

    Ok(Json(DeletedResponse { deleted: true }))
}

/// PUT /api/v1/prompts/{name}/tags/{key}
pub async fn set_prompt_tag(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Json(body): Json<TagValueBody>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = state
        .prompt_service
        .set_prompt_tag(&name, &key, &body.value)
        .await?;

    Ok(Json(PromptResponse::from(&prompt)))
}

/// DELETE /api/v1/prompts/{name}/tags/{key}
pub async fn delete_prompt_tag(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = state.prompt_service.delete_prompt_tag(&name, &key).await?;

    Ok(Json(PromptResponse::from(&prompt)))
}
