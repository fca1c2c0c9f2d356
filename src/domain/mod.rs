//! Domain layer - prompt registry entities and storage abstraction

pub mod error;
pub mod prompt;
pub mod storage;

pub use error::DomainError;
pub use prompt::{
    ChatMessage, FormattedPrompt, Prompt, PromptName, PromptReference, PromptTemplate, PromptUri,
    PromptVersion, TemplateError,
};
pub use storage::{Storage, StorageEntity, StorageKey};
