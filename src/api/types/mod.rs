//! API request, response and error types

pub mod error;
pub mod json;
pub mod prompt;

pub use error::{ApiError, ApiErrorResponse};
pub use json::{Json, Query};
pub use prompt::{
    CreatePromptBody, CreateVersionBody, DeletedResponse, FormatBody, FormatResponse, LoadQuery,
    PageResponse, PromptResponse, PromptVersionResponse, RegisterBody, SearchQuery, SetAliasBody,
    TagValueBody, UpdatePromptBody, VersionListQuery,
};
