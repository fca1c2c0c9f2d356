//! Prompt registry v1 API

pub mod aliases;
pub mod prompts;
pub mod registry;
pub mod versions;

use axum::{
    routing::{get, post, put},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/prompts",
            get(prompts::search_prompts).post(prompts::create_prompt),
        )
        .route(
            "/prompts/{name}",
            get(prompts::get_prompt)
                .patch(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route(
            "/prompts/{name}/tags/{key}",
            put(prompts::set_prompt_tag).delete(prompts::delete_prompt_tag),
        )
        .route(
            "/prompts/{name}/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        .route(
            "/prompts/{name}/versions/{version}",
            get(versions::get_version).delete(versions::delete_version),
        )
        .route(
            "/prompts/{name}/versions/{version}/tags/{key}",
            put(versions::set_version_tag).delete(versions::delete_version_tag),
        )
        .route(
            "/prompts/{name}/versions/{version}/format",
            post(versions::format_version),
        )
        .route(
            "/prompts/{name}/aliases/{alias}",
            get(aliases::get_alias)
                .put(aliases::set_alias)
                .delete(aliases::delete_alias),
        )
        .route("/register", post(registry::register))
        .route("/load", get(registry::load))
        .route("/format", post(registry::format))
}
