//! Shared application state

use std::sync::Arc;

use crate::infrastructure::services::PromptService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub prompt_service: Arc<PromptService>,
}

impl AppState {
    pub fn new(prompt_service: Arc<PromptService>) -> Self {
        Self { prompt_service }
    }
}
