//! Prompt registry domain - versioned templates, aliases and search

mod entity;
mod search;
mod template;
mod uri;
mod validation;

pub use entity::{Prompt, PromptName, PromptVersion};
pub use search::{
    resolve_max_results, sort_prompts, Comparator, FilterAttribute, FilterCondition, OrderBy,
    OrderField, PageToken, PagedList, SearchError, SearchFilter,
};
pub use template::{ChatMessage, FormattedPrompt, PromptTemplate, TemplateError};
pub use uri::{PromptReference, PromptUri, PromptUriError, PROMPT_URI_SCHEME};
pub use validation::{
    parse_version, validate_alias, validate_prompt_name, validate_tag, validate_version,
    PromptValidationError,
    LATEST_ALIAS, MAX_ALIAS_LENGTH, MAX_PROMPT_NAME_LENGTH, MAX_TAG_KEY_LENGTH,
    MAX_TAG_VALUE_LENGTH,
};
