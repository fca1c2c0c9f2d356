//! Infrastructure services

mod prompt_service;

pub use prompt_service::{
    CreatePromptRequest, CreateVersionRequest, FormatResult, PromptService, PromptServiceConfig,
    RegisterPromptRequest, SearchPromptsRequest, VersionDetails,
};
