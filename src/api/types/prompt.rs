//! Request and response bodies for the prompt registry API

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::prompt::{FormattedPrompt, PagedList, Prompt, PromptTemplate};
use crate::infrastructure::services::{CreateVersionRequest, FormatResult, VersionDetails};

/// Prompt without its version bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub aliases: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<u32>,
    pub version_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Prompt> for PromptResponse {
    fn from(prompt: &Prompt) -> Self {
        Self {
            name: prompt.name().to_string(),
            description: prompt.description().map(String::from),
            tags: prompt.tags().clone(),
            aliases: prompt.aliases().clone(),
            latest_version: prompt.latest_version().map(|v| v.version()),
            version_count: prompt.versions().len(),
            created_at: prompt.created_at().to_rfc3339(),
            updated_at: prompt.updated_at().to_rfc3339(),
        }
    }
}

impl From<Prompt> for PromptResponse {
    fn from(prompt: Prompt) -> Self {
        Self::from(&prompt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersionResponse {
    pub name: String,
    pub version: u32,
    pub uri: String,
    pub template: PromptTemplate,
    pub is_text: bool,
    pub variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub aliases: Vec<String>,
    pub created_at: String,
}

impl From<VersionDetails> for PromptVersionResponse {
    fn from(details: VersionDetails) -> Self {
        let version = details.version;

        Self {
            name: version.name().to_string(),
            version: version.version(),
            uri: version.uri(),
            template: version.template().clone(),
            is_text: version.template().is_text(),
            variables: version.variables().to_vec(),
            response_format: version.response_format().cloned(),
            commit_message: version.commit_message().map(String::from),
            tags: version.tags().clone(),
            aliases: details.aliases,
            created_at: version.created_at().to_rfc3339(),
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<S, T> From<PagedList<S>> for PageResponse<T>
where
    T: From<S>,
{
    fn from(page: PagedList<S>) -> Self {
        Self {
            items: page.items.into_iter().map(T::from).collect(),
            next_page_token: page.next_page_token,
        }
    }
}

/// Query parameters for paged listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub filter: Option<String>,
    pub max_results: Option<usize>,
    /// Comma separated clauses, e.g. `name DESC,creation_timestamp`
    pub order_by: Option<String>,
    pub page_token: Option<String>,
}

impl SearchQuery {
    pub fn order_by_clauses(&self) -> Vec<String> {
        self.order_by
            .as_deref()
            .map(|raw| raw.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or_default()
    }
}

/// Query parameters for version listings; filtering and ordering are not offered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionListQuery {
    pub max_results: Option<usize>,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePromptBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePromptBody {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagValueBody {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAliasBody {
    pub version: u32,
}

/// Body for creating a version
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVersionBody {
    pub template: PromptTemplate,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub response_format: Option<serde_json::Value>,
}

impl From<CreateVersionBody> for CreateVersionRequest {
    fn from(body: CreateVersionBody) -> Self {
        Self {
            template: body.template,
            commit_message: body.commit_message,
            tags: body.tags,
            response_format: body.response_format,
        }
    }
}

/// Body for `POST /register`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBody {
    pub name: String,
    #[serde(flatten)]
    pub version: CreateVersionBody,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prompt_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadQuery {
    pub uri: String,
}

/// Body for formatting; `uri` is only read by `POST /format`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatBody {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub allow_partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatResponse {
    pub name: String,
    pub version: u32,
    pub uri: String,
    pub result: FormattedPrompt,
}

impl From<FormatResult> for FormatResponse {
    fn from(result: FormatResult) -> Self {
        Self {
            name: result.version.name().to_string(),
            version: result.version.version(),
            uri: result.version.uri(),
            result: result.formatted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_body_flattens_version_fields() {
        let body: RegisterBody = serde_json::from_value(serde_json::json!({
            "name": "summarizer",
            "template": "Summarize {{ text }}",
            "commit_message": "first",
            "tags": {"author": "ada"},
            "prompt_tags": {"team": "nlp"}
        }))
        .unwrap();

        assert_eq!(body.name, "summarizer");
        assert_eq!(body.version.template, PromptTemplate::text("Summarize {{ text }}"));
        assert_eq!(body.version.commit_message.as_deref(), Some("first"));
        assert_eq!(body.version.tags.get("author").map(String::as_str), Some("ada"));
        assert_eq!(body.prompt_tags.get("team").map(String::as_str), Some("nlp"));
    }

    #[test]
    fn test_order_by_clauses() {
        let query = SearchQuery {
            order_by: Some("name DESC, creation_timestamp".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.order_by_clauses(),
            vec!["name DESC".to_string(), "creation_timestamp".to_string()]
        );
        assert!(SearchQuery::default().order_by_clauses().is_empty());
    }
}
