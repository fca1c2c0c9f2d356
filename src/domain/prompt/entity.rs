//! Prompt aggregate: versions, aliases and tags

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::template::PromptTemplate;
use super::uri::{PromptReference, PromptUri};
use super::validation::{validate_prompt_name, PromptValidationError};
use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Prompt name - unique key of a prompt in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromptName(String);

impl PromptName {
    /// Create a new PromptName after validation
    pub fn new(name: impl Into<String>) -> Result<Self, PromptValidationError> {
        let name = name.into();
        validate_prompt_name(&name)?;
        Ok(Self(name))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PromptName {
    type Error = PromptValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PromptName> for String {
    fn from(name: PromptName) -> Self {
        name.0
    }
}

impl std::fmt::Display for PromptName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for PromptName {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// An immutable, numbered snapshot of a prompt template
///
/// Only the tags of a version can change after it has been added to a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    /// Name of the owning prompt
    name: String,
    /// Version number (1-indexed)
    version: u32,
    template: PromptTemplate,
    /// Variables referenced by the template, in order of first appearance
    variables: Vec<String>,
    /// Expected response schema for structured outputs
    #[serde(skip_serializing_if = "Option::is_none", default)]
    response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    commit_message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    tags: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
}

impl PromptVersion {
    /// Create a new prompt version
    pub fn new(name: impl Into<String>, version: u32, template: PromptTemplate) -> Self {
        let variables = template.variables();

        Self {
            name: name.into(),
            version,
            template,
            variables,
            response_format: None,
            commit_message: None,
            tags: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_response_format(mut self, response_format: serde_json::Value) -> Self {
        self.response_format = Some(response_format);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn response_format(&self) -> Option<&serde_json::Value> {
        self.response_format.as_ref()
    }

    pub fn commit_message(&self) -> Option<&str> {
        self.commit_message.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Canonical `prompts:/name/version` URI of this version
    pub fn uri(&self) -> String {
        PromptUri::new(self.name.clone(), PromptReference::Version(self.version)).to_string()
    }
}

/// Prompt entity - a named, versioned template container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique name
    name: PromptName,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    tags: BTreeMap<String, String>,
    /// Alias table: alias -> version number
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    aliases: BTreeMap<String, u32>,
    /// Template store, ascending by version number
    #[serde(default)]
    versions: Vec<PromptVersion>,
    /// Highest version number ever assigned; never decreases
    #[serde(default)]
    last_version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Create an empty prompt
    pub fn new(name: PromptName) -> Self {
        let now = Utc::now();
        Self {
            name,
            description: None,
            tags: BTreeMap::new(),
            aliases: BTreeMap::new(),
            versions: Vec::new(),
            last_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    // Getters

    pub fn name(&self) -> &PromptName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn aliases(&self) -> &BTreeMap<String, u32> {
        &self.aliases
    }

    pub fn versions(&self) -> &[PromptVersion] {
        &self.versions
    }

    pub fn last_version(&self) -> u32 {
        self.last_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Get a specific version
    pub fn version(&self, version: u32) -> Option<&PromptVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Highest existing version
    pub fn latest_version(&self) -> Option<&PromptVersion> {
        self.versions.iter().max_by_key(|v| v.version)
    }

    /// Resolve a version number, alias or `latest` to a version
    pub fn resolve(&self, reference: &PromptReference) -> Option<&PromptVersion> {
        match reference {
            PromptReference::Version(version) => self.version(*version),
            PromptReference::Alias(alias) => self
                .aliases
                .get(alias)
                .and_then(|version| self.version(*version)),
            PromptReference::Latest => self.latest_version(),
        }
    }

    /// Aliases currently pointing at `version`, sorted
    pub fn aliases_for(&self, version: u32) -> Vec<String> {
        self.aliases
            .iter()
            .filter(|(_, v)| **v == version)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    // Mutators

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
        self.touch();
    }

    pub fn delete_tag(&mut self, key: &str) -> bool {
        let removed = self.tags.remove(key).is_some();

        if removed {
            self.touch();
        }
        removed
    }

    /// Append a new version with the next version number
    pub fn add_version(
        &mut self,
        template: PromptTemplate,
        commit_message: Option<String>,
        tags: BTreeMap<String, String>,
        response_format: Option<serde_json::Value>,
    ) -> &PromptVersion {
        self.last_version += 1;

        let mut version =
            PromptVersion::new(self.name.as_str(), self.last_version, template).with_tags(tags);

        if let Some(message) = commit_message {
            version = version.with_commit_message(message);
        }

        if let Some(schema) = response_format {
            version = version.with_response_format(schema);
        }

        self.versions.push(version);
        self.touch();

        &self.versions[self.versions.len() - 1]
    }

    /// Remove a version and every alias pointing to it
    pub fn delete_version(&mut self, version: u32) -> bool {
        let Some(pos) = self.versions.iter().position(|v| v.version == version) else {
            return false;
        };

        self.versions.remove(pos);
        self.aliases.retain(|_, v| *v != version);
        self.touch();
        true
    }

    /// Point `alias` at `version`, returning the version it pointed at before
    pub fn set_alias(
        &mut self,
        alias: impl Into<String>,
        version: u32,
    ) -> Result<Option<u32>, DomainError> {
        if self.version(version).is_none() {
            return Err(DomainError::not_found(format!(
                "Version {} of prompt '{}' not found",
                version, self.name
            )));
        }

        let previous = self.aliases.insert(alias.into(), version);
        self.touch();
        Ok(previous)
    }

    pub fn delete_alias(&mut self, alias: &str) -> bool {
        let removed = self.aliases.remove(alias).is_some();

        if removed {
            self.touch();
        }
        removed
    }

    pub fn set_version_tag(
        &mut self,
        version: u32,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomainError> {
        let entry = self.version_mut(version)?;
        entry.tags.insert(key.into(), value.into());
        self.touch();
        Ok(())
    }

    pub fn delete_version_tag(&mut self, version: u32, key: &str) -> Result<bool, DomainError> {
        let removed = self.version_mut(version)?.tags.remove(key).is_some();

        if removed {
            self.touch();
        }
        Ok(removed)
    }

    fn version_mut(&mut self, version: u32) -> Result<&mut PromptVersion, DomainError> {
        let name = self.name.clone();

        self.versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Version {} of prompt '{}' not found",
                    version, name
                ))
            })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Prompt {
    type Key = PromptName;

    fn key(&self) -> &Self::Key {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_prompt(name: &str) -> Prompt {
        Prompt::new(PromptName::new(name).unwrap())
    }

    fn add_text(prompt: &mut Prompt, text: &str) -> u32 {
        prompt
            .add_version(PromptTemplate::text(text), None, BTreeMap::new(), None)
            .version()
    }

    #[test]
    fn test_prompt_name_valid() {
        let name = PromptName::new("summarizer.v2").unwrap();
        assert_eq!(name.as_str(), "summarizer.v2");
    }

    #[test]
    fn test_prompt_name_invalid() {
        assert!(PromptName::new("bad name!").is_err());
        assert!(serde_json::from_str::<PromptName>(r#""bad/name""#).is_err());
    }

    #[test]
    fn test_prompt_creation() {
        let prompt = create_prompt("summarizer")
            .with_description("Summarization prompts")
            .with_tag("team", "nlp");

        assert_eq!(prompt.name().as_str(), "summarizer");
        assert_eq!(prompt.description(), Some("Summarization prompts"));
        assert_eq!(prompt.tags().get("team"), Some(&"nlp".to_string()));
        assert!(prompt.versions().is_empty());
        assert!(prompt.latest_version().is_none());
        assert_eq!(prompt.last_version(), 0);
    }

    #[test]
    fn test_add_version_assigns_sequential_numbers() {
        let mut prompt = create_prompt("seq");

        assert_eq!(add_text(&mut prompt, "one"), 1);
        assert_eq!(add_text(&mut prompt, "two"), 2);
        assert_eq!(add_text(&mut prompt, "three"), 3);

        assert_eq!(prompt.latest_version().unwrap().version(), 3);
        assert_eq!(
            prompt.version(2).unwrap().template(),
            &PromptTemplate::text("two")
        );
    }

    #[test]
    fn test_version_numbers_not_reused_after_delete() {
        let mut prompt = create_prompt("monotonic");
        add_text(&mut prompt, "one");
        add_text(&mut prompt, "two");
        add_text(&mut prompt, "three");

        assert!(prompt.delete_version(3));
        assert_eq!(prompt.latest_version().unwrap().version(), 2);

        assert_eq!(add_text(&mut prompt, "four"), 4);
        assert!(prompt.version(3).is_none());
    }

    #[test]
    fn test_add_version_metadata() {
        let mut prompt = create_prompt("meta");
        let schema = serde_json::json!({"type": "object"});
        let mut tags = BTreeMap::new();
        tags.insert("author".to_string(), "ada".to_string());

        let version = prompt
            .add_version(
                PromptTemplate::text("Hi {{ name }}"),
                Some("initial".to_string()),
                tags,
                Some(schema.clone()),
            )
            .clone();

        assert_eq!(version.name(), "meta");
        assert_eq!(version.variables(), &["name".to_string()]);
        assert_eq!(version.commit_message(), Some("initial"));
        assert_eq!(version.response_format(), Some(&schema));
        assert_eq!(version.tags().get("author"), Some(&"ada".to_string()));
        assert_eq!(version.uri(), "prompts:/meta/1");
    }

    #[test]
    fn test_alias_set_resolve_and_reassign() {
        let mut prompt = create_prompt("aliased");
        add_text(&mut prompt, "one");
        add_text(&mut prompt, "two");

        assert_eq!(prompt.set_alias("production", 1).unwrap(), None);
        let resolved = prompt
            .resolve(&PromptReference::Alias("production".to_string()))
            .unwrap();
        assert_eq!(resolved.version(), 1);

        assert_eq!(prompt.set_alias("production", 2).unwrap(), Some(1));
        assert_eq!(prompt.aliases_for(2), vec!["production"]);
        assert!(prompt.aliases_for(1).is_empty());
    }

    #[test]
    fn test_alias_to_missing_version_fails() {
        let mut prompt = create_prompt("missing");
        add_text(&mut prompt, "one");

        let result = prompt.set_alias("production", 7);
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
        assert!(prompt.aliases().is_empty());
    }

    #[test]
    fn test_delete_version_removes_aliases() {
        let mut prompt = create_prompt("cleanup");
        add_text(&mut prompt, "one");
        add_text(&mut prompt, "two");
        prompt.set_alias("production", 1).unwrap();
        prompt.set_alias("staging", 1).unwrap();
        prompt.set_alias("canary", 2).unwrap();

        assert!(prompt.delete_version(1));
        assert!(!prompt.delete_version(1));

        assert_eq!(prompt.aliases().len(), 1);
        assert!(prompt
            .resolve(&PromptReference::Alias("production".to_string()))
            .is_none());
        assert_eq!(prompt.aliases_for(2), vec!["canary"]);
    }

    #[test]
    fn test_resolve_latest() {
        let mut prompt = create_prompt("latest");
        assert!(prompt.resolve(&PromptReference::Latest).is_none());

        add_text(&mut prompt, "one");
        add_text(&mut prompt, "two");

        let latest = prompt.resolve(&PromptReference::Latest).unwrap();
        assert_eq!(latest.version(), 2);
    }

    #[test]
    fn test_prompt_tags() {
        let mut prompt = create_prompt("tagged");

        prompt.set_tag("team", "nlp");
        prompt.set_tag("team", "search");
        assert_eq!(prompt.tags().get("team"), Some(&"search".to_string()));

        assert!(prompt.delete_tag("team"));
        assert!(!prompt.delete_tag("team"));
    }

    #[test]
    fn test_version_tags() {
        let mut prompt = create_prompt("vtags");
        add_text(&mut prompt, "one");

        prompt.set_version_tag(1, "reviewed", "yes").unwrap();
        assert_eq!(
            prompt.version(1).unwrap().tags().get("reviewed"),
            Some(&"yes".to_string())
        );

        assert!(prompt.delete_version_tag(1, "reviewed").unwrap());
        assert!(!prompt.delete_version_tag(1, "reviewed").unwrap());
        assert!(prompt.set_version_tag(9, "k", "v").is_err());
    }

    #[test]
    fn test_storage_round_trip() {
        let mut prompt = create_prompt("stored").with_tag("team", "nlp");
        add_text(&mut prompt, "Hello {{ name }}");
        prompt.set_alias("production", 1).unwrap();

        let json = serde_json::to_value(&prompt).unwrap();
        let restored: Prompt = serde_json::from_value(json).unwrap();

        assert_eq!(restored.key().as_str(), "stored");
        assert_eq!(restored.last_version(), 1);
        assert_eq!(restored.aliases().get("production"), Some(&1));
        assert_eq!(restored.versions(), prompt.versions());
    }
}
