//! Prompt template variables and formatting
//!
//! Templates use double-brace placeholders: `{{ variable }}`. Whitespace
//! inside the braces is ignored, so `{{name}}` and `{{ name }}` are the same
//! variable.
//! - Text templates are a single string
//! - Chat templates are an ordered list of role/content messages

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DomainError;

/// Regex to match variable placeholders: {{name}} or {{ name }}
static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").unwrap());

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing variables: {}", names.join(", "))]
    MissingVariables { names: Vec<String> },

    #[error("Text template cannot be empty")]
    EmptyTemplate,

    #[error("Chat template must contain at least one message")]
    EmptyChat,

    #[error("Chat message {index} has an empty role")]
    EmptyRole { index: usize },
}

impl From<TemplateError> for DomainError {
    fn from(error: TemplateError) -> Self {
        DomainError::validation(error.to_string())
    }
}

/// A single message of a chat template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Template body of a prompt version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptTemplate {
    /// Plain text with placeholders
    Text(String),
    /// Ordered chat messages with placeholders in their content
    Chat(Vec<ChatMessage>),
}

/// Result of formatting a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormattedPrompt {
    Text(String),
    Chat(Vec<ChatMessage>),
}

impl FormattedPrompt {
    /// The formatted text, if this came from a text template
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Chat(_) => None,
        }
    }

    /// The formatted messages, if this came from a chat template
    pub fn as_messages(&self) -> Option<&[ChatMessage]> {
        match self {
            Self::Text(_) => None,
            Self::Chat(messages) => Some(messages),
        }
    }
}

impl PromptTemplate {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        Self::Chat(messages)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Check structural validity of the template
    pub fn validate(&self) -> Result<(), TemplateError> {
        match self {
            Self::Text(text) if text.trim().is_empty() => Err(TemplateError::EmptyTemplate),
            Self::Text(_) => Ok(()),
            Self::Chat(messages) if messages.is_empty() => Err(TemplateError::EmptyChat),
            Self::Chat(messages) => {
                if let Some(index) = messages.iter().position(|m| m.role.trim().is_empty()) {
                    return Err(TemplateError::EmptyRole { index });
                }
                Ok(())
            }
        }
    }

    /// Variable names in order of first appearance, without duplicates
    pub fn variables(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut variables = Vec::new();

        for content in self.contents() {
            for cap in VARIABLE_PATTERN.captures_iter(content) {
                let name = &cap[1];

                if seen.insert(name.to_string()) {
                    variables.push(name.to_string());
                }
            }
        }

        variables
    }

    /// Substitute placeholders with the given values
    ///
    /// Values for names the template does not reference are ignored. When
    /// `allow_partial` is set, placeholders without a value are kept as-is.
    pub fn format(
        &self,
        values: &HashMap<String, String>,
        allow_partial: bool,
    ) -> Result<FormattedPrompt, TemplateError> {
        if !allow_partial {
            let missing: BTreeSet<String> = self
                .variables()
                .into_iter()
                .filter(|name| !values.contains_key(name))
                .collect();

            if !missing.is_empty() {
                return Err(TemplateError::MissingVariables {
                    names: missing.into_iter().collect(),
                });
            }
        }

        let formatted = match self {
            Self::Text(text) => FormattedPrompt::Text(substitute(text, values)),
            Self::Chat(messages) => FormattedPrompt::Chat(
                messages
                    .iter()
                    .map(|m| ChatMessage::new(m.role.clone(), substitute(&m.content, values)))
                    .collect(),
            ),
        };

        Ok(formatted)
    }

    /// Convert `{{ name }}` placeholders to single-brace `{name}` form
    pub fn to_single_brace_format(&self) -> PromptTemplate {
        let convert =
            |content: &str| VARIABLE_PATTERN.replace_all(content, "{$1}").into_owned();

        match self {
            Self::Text(text) => Self::Text(convert(text)),
            Self::Chat(messages) => Self::Chat(
                messages
                    .iter()
                    .map(|m| ChatMessage::new(m.role.clone(), convert(&m.content)))
                    .collect(),
            ),
        }
    }

    fn contents(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Chat(messages) => messages.iter().map(|m| m.content.as_str()).collect(),
        }
    }
}

/// Single pass replacement; substituted values are never re-scanned
fn substitute(content: &str, values: &HashMap<String, String>) -> String {
    VARIABLE_PATTERN
        .replace_all(content, |cap: &Captures<'_>| match values.get(&cap[1]) {
            Some(value) => value.clone(),
            None => cap[0].to_string(),
        })
        .into_owned()
}
