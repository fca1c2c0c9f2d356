//! Prompt service - registry use cases over prompt storage

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::prompt::{
    resolve_max_results, sort_prompts, validate_alias, validate_tag, validate_version,
    FormattedPrompt, OrderBy,
    PageToken, PagedList, Prompt, PromptName, PromptReference, PromptTemplate, PromptUri,
    PromptVersion, SearchFilter, LATEST_ALIAS,
};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

/// Search limits
#[derive(Debug, Clone)]
pub struct PromptServiceConfig {
    pub default_max_results: usize,
    pub max_results_limit: usize,
}

impl Default for PromptServiceConfig {
    fn default() -> Self {
        Self {
            default_max_results: 100,
            max_results_limit: 1000,
        }
    }
}

/// Request to create an empty prompt
#[derive(Debug, Clone)]
pub struct CreatePromptRequest {
    pub name: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

/// Request to add a version to an existing prompt
#[derive(Debug, Clone)]
pub struct CreateVersionRequest {
    pub template: PromptTemplate,
    pub commit_message: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub response_format: Option<serde_json::Value>,
}

impl CreateVersionRequest {
    pub fn new(template: PromptTemplate) -> Self {
        Self {
            template,
            commit_message: None,
            tags: BTreeMap::new(),
            response_format: None,
        }
    }
}

/// Request to register a version, creating the prompt on first use
#[derive(Debug, Clone)]
pub struct RegisterPromptRequest {
    pub name: String,
    pub version: CreateVersionRequest,
    /// Description for a newly created prompt; ignored if the prompt exists
    pub description: Option<String>,
    /// Prompt-level tags merged into the prompt
    pub prompt_tags: BTreeMap<String, String>,
}

/// Search parameters for prompts
#[derive(Debug, Clone, Default)]
pub struct SearchPromptsRequest {
    pub filter: Option<String>,
    pub max_results: Option<usize>,
    pub order_by: Vec<String>,
    pub page_token: Option<String>,
}

/// A version together with the aliases currently pointing at it
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDetails {
    pub version: PromptVersion,
    pub aliases: Vec<String>,
}

impl VersionDetails {
    fn from_prompt(prompt: &Prompt, version: &PromptVersion) -> Self {
        Self {
            version: version.clone(),
            aliases: prompt.aliases_for(version.version()),
        }
    }
}

/// Outcome of formatting a stored version
#[derive(Debug, Clone, PartialEq)]
pub struct FormatResult {
    pub version: PromptVersion,
    pub formatted: FormattedPrompt,
}

/// Registry operations on prompts, versions, aliases and tags
///
/// Mutations are read-modify-write on the whole `Prompt` aggregate and are
/// serialized by `write_lock`, so concurrent registrations never share a
/// version number. Reads go straight to storage.
#[derive(Debug)]
pub struct PromptService {
    storage: Arc<dyn Storage<Prompt>>,
    config: PromptServiceConfig,
    write_lock: Mutex<()>,
}

impl PromptService {
    pub fn new(storage: Arc<dyn Storage<Prompt>>) -> Self {
        Self::with_config(storage, PromptServiceConfig::default())
    }

    pub fn with_config(storage: Arc<dyn Storage<Prompt>>, config: PromptServiceConfig) -> Self {
        Self {
            storage,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PromptServiceConfig {
        &self.config
    }

    // Prompts

    pub async fn create_prompt(&self, request: CreatePromptRequest) -> Result<Prompt, DomainError> {
        let name = PromptName::new(request.name)?;
        validate_tags(&request.tags)?;

        debug!(prompt = %name, "Creating prompt");

        let mut prompt = Prompt::new(name).with_tags(request.tags);

        if let Some(description) = request.description {
            prompt = prompt.with_description(description);
        }

        let _guard = self.write_lock.lock().await;

        if self.storage.exists(prompt.name()).await? {
            return Err(DomainError::conflict(format!(
                "Prompt '{}' already exists",
                prompt.name()
            )));
        }

        let prompt = self.storage.create(prompt).await?;

        info!(prompt = %prompt.name(), "Prompt created");
        Ok(prompt)
    }

    pub async fn get_prompt(&self, name: &str) -> Result<Option<Prompt>, DomainError> {
        let name = PromptName::new(name)?;
        debug!(prompt = %name, "Getting prompt");
        self.storage.get(&name).await
    }

    pub async fn get_prompt_required(&self, name: &str) -> Result<Prompt, DomainError> {
        self.get_prompt(name)
            .await?
            .ok_or_else(|| prompt_not_found(name))
    }

    /// Replace the description of a prompt; `None` clears it
    pub async fn update_prompt(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Prompt, DomainError> {
        self.mutate(name, |prompt| {
            prompt.set_description(description);
            Ok(())
        })
        .await
        .inspect(|prompt| info!(prompt = %prompt.name(), "Prompt updated"))
    }

    /// Delete a prompt with all of its versions and aliases
    pub async fn delete_prompt(&self, name: &str) -> Result<(), DomainError> {
        let key = PromptName::new(name)?;

        let _guard = self.write_lock.lock().await;

        if !self.storage.delete(&key).await? {
            return Err(prompt_not_found(name));
        }

        info!(prompt = %key, "Prompt deleted");
        Ok(())
    }

    pub async fn set_prompt_tag(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<Prompt, DomainError> {
        validate_tag(key, value)?;

        self.mutate(name, |prompt| {
            prompt.set_tag(key, value);
            Ok(())
        })
        .await
        .inspect(|_| debug!(prompt = %name, tag = %key, "Prompt tag set"))
    }

    /// Remove a prompt tag; removing an absent tag is not an error
    pub async fn delete_prompt_tag(&self, name: &str, key: &str) -> Result<Prompt, DomainError> {
        self.mutate(name, |prompt| {
            if !prompt.delete_tag(key) {
                debug!(prompt = %name, tag = %key, "Prompt tag not present");
            }
            Ok(())
        })
        .await
    }

    pub async fn search_prompts(
        &self,
        request: SearchPromptsRequest,
    ) -> Result<PagedList<Prompt>, DomainError> {
        let filter = SearchFilter::parse(request.filter.as_deref().unwrap_or_default())?;
        let order_by = OrderBy::parse_all(&request.order_by)?;
        let max_results = self.max_results(request.max_results)?;
        let offset = PageToken::offset_of(request.page_token.as_deref())?;

        let mut prompts: Vec<Prompt> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        sort_prompts(&mut prompts, &order_by);

        debug!(
            matched = prompts.len(),
            offset,
            max_results,
            "Searched prompts"
        );

        Ok(PagedList::paginate(prompts, offset, max_results))
    }

    // Versions

    /// Add a new version to an existing prompt
    pub async fn create_prompt_version(
        &self,
        name: &str,
        request: CreateVersionRequest,
    ) -> Result<VersionDetails, DomainError> {
        validate_version_request(&request)?;

        let _guard = self.write_lock.lock().await;
        let mut prompt = self.load_required(name).await?;

        let details = append_version(&mut prompt, request);
        self.storage.update(prompt).await?;

        info!(
            prompt = %name,
            version = details.version.version(),
            "Prompt version created"
        );
        Ok(details)
    }

    /// Register a template, creating the prompt if it does not exist yet
    pub async fn register_prompt(
        &self,
        request: RegisterPromptRequest,
    ) -> Result<VersionDetails, DomainError> {
        let name = PromptName::new(request.name)?;
        validate_tags(&request.prompt_tags)?;
        validate_version_request(&request.version)?;

        let _guard = self.write_lock.lock().await;

        let (mut prompt, is_new) = match self.storage.get(&name).await? {
            Some(prompt) => (prompt, false),
            None => {
                let mut prompt = Prompt::new(name.clone());

                if let Some(description) = request.description {
                    prompt = prompt.with_description(description);
                }
                (prompt, true)
            }
        };

        for (key, value) in request.prompt_tags {
            prompt.set_tag(key, value);
        }

        let details = append_version(&mut prompt, request.version);

        if is_new {
            self.storage.create(prompt).await?;
        } else {
            self.storage.update(prompt).await?;
        }

        info!(
            prompt = %name,
            version = details.version.version(),
            new_prompt = is_new,
            "Prompt registered"
        );
        Ok(details)
    }

    pub async fn get_prompt_version(
        &self,
        name: &str,
        version: u32,
    ) -> Result<Option<VersionDetails>, DomainError> {
        validate_version(version)?;
        self.resolve_in(name, &PromptReference::Version(version))
            .await
    }

    /// Resolve an alias; `latest` resolves to the newest version
    pub async fn get_prompt_version_by_alias(
        &self,
        name: &str,
        alias: &str,
    ) -> Result<Option<VersionDetails>, DomainError> {
        let reference = if alias.eq_ignore_ascii_case(LATEST_ALIAS) {
            PromptReference::Latest
        } else {
            PromptReference::Alias(alias.to_string())
        };

        self.resolve_in(name, &reference).await
    }

    /// Load the version a `prompts:/` URI points at
    pub async fn load_prompt(&self, uri: &str) -> Result<VersionDetails, DomainError> {
        let uri = PromptUri::parse(uri)?;
        self.load_uri(&uri).await
    }

    pub async fn delete_prompt_version(&self, name: &str, version: u32) -> Result<(), DomainError> {
        validate_version(version)?;
        let _guard = self.write_lock.lock().await;
        let mut prompt = self.load_required(name).await?;

        let removed_aliases = prompt.aliases_for(version);

        if !prompt.delete_version(version) {
            return Err(version_not_found(name, version));
        }

        self.storage.update(prompt).await?;

        if !removed_aliases.is_empty() {
            warn!(
                prompt = %name,
                version,
                aliases = ?removed_aliases,
                "Deleted aliases pointing at removed version"
            );
        }
        info!(prompt = %name, version, "Prompt version deleted");
        Ok(())
    }

    pub async fn set_prompt_version_tag(
        &self,
        name: &str,
        version: u32,
        key: &str,
        value: &str,
    ) -> Result<VersionDetails, DomainError> {
        validate_version(version)?;
        validate_tag(key, value)?;

        let prompt = self
            .mutate(name, |prompt| prompt.set_version_tag(version, key, value))
            .await?;

        debug!(prompt = %name, version, tag = %key, "Version tag set");
        details_of(&prompt, version)
    }

    pub async fn delete_prompt_version_tag(
        &self,
        name: &str,
        version: u32,
        key: &str,
    ) -> Result<VersionDetails, DomainError> {
        validate_version(version)?;
        let prompt = self
            .mutate(name, |prompt| prompt.delete_version_tag(version, key).map(|_| ()))
            .await?;

        details_of(&prompt, version)
    }

    /// List the versions of a prompt, newest first
    pub async fn search_prompt_versions(
        &self,
        name: &str,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<PagedList<VersionDetails>, DomainError> {
        let max_results = self.max_results(max_results)?;
        let offset = PageToken::offset_of(page_token)?;
        let prompt = self.get_prompt_required(name).await?;

        let mut versions: Vec<VersionDetails> = prompt
            .versions()
            .iter()
            .map(|v| VersionDetails::from_prompt(&prompt, v))
            .collect();
        versions.sort_by(|a, b| b.version.version().cmp(&a.version.version()));

        Ok(PagedList::paginate(versions, offset, max_results))
    }

    // Aliases

    /// Point an alias at a version, replacing any previous target
    pub async fn set_prompt_alias(
        &self,
        name: &str,
        alias: &str,
        version: u32,
    ) -> Result<VersionDetails, DomainError> {
        validate_alias(alias)?;
        validate_version(version)?;

        let mut previous = None;
        let prompt = self
            .mutate(name, |prompt| {
                previous = prompt.set_alias(alias, version)?;
                Ok(())
            })
            .await?;

        info!(
            prompt = %name,
            alias = %alias,
            version,
            previous = ?previous,
            "Prompt alias set"
        );
        details_of(&prompt, version)
    }

    pub async fn delete_prompt_alias(&self, name: &str, alias: &str) -> Result<(), DomainError> {
        self.mutate(name, |prompt| {
            if prompt.delete_alias(alias) {
                Ok(())
            } else {
                Err(DomainError::not_found(format!(
                    "Alias '{}' not found for prompt '{}'",
                    alias, name
                )))
            }
        })
        .await?;

        info!(prompt = %name, alias = %alias, "Prompt alias deleted");
        Ok(())
    }

    // Formatting

    /// Load a version by URI and substitute its variables
    pub async fn format_prompt(
        &self,
        uri: &str,
        values: &HashMap<String, String>,
        allow_partial: bool,
    ) -> Result<FormatResult, DomainError> {
        let uri = PromptUri::parse(uri)?;
        self.format_uri(&uri, values, allow_partial).await
    }

    pub async fn format_prompt_version(
        &self,
        name: &str,
        version: u32,
        values: &HashMap<String, String>,
        allow_partial: bool,
    ) -> Result<FormatResult, DomainError> {
        validate_version(version)?;
        let uri = PromptUri::new(name, PromptReference::Version(version));
        self.format_uri(&uri, values, allow_partial).await
    }

    /// Number of stored prompts
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.storage.count().await
    }

    // Internals

    async fn format_uri(
        &self,
        uri: &PromptUri,
        values: &HashMap<String, String>,
        allow_partial: bool,
    ) -> Result<FormatResult, DomainError> {
        let details = self.load_uri(uri).await?;
        let formatted = details
            .version
            .template()
            .format(values, allow_partial)?;

        debug!(uri = %uri, allow_partial, "Prompt formatted");

        Ok(FormatResult {
            version: details.version,
            formatted,
        })
    }

    async fn load_uri(&self, uri: &PromptUri) -> Result<VersionDetails, DomainError> {
        debug!(uri = %uri, "Loading prompt");

        self.resolve_in(&uri.name, &uri.reference)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Prompt '{}' has no {} ({})",
                    uri.name, uri.reference, uri
                ))
            })
    }

    async fn resolve_in(
        &self,
        name: &str,
        reference: &PromptReference,
    ) -> Result<Option<VersionDetails>, DomainError> {
        let Some(prompt) = self.get_prompt(name).await? else {
            return Ok(None);
        };

        Ok(prompt
            .resolve(reference)
            .map(|v| VersionDetails::from_prompt(&prompt, v)))
    }

    async fn load_required(&self, name: &str) -> Result<Prompt, DomainError> {
        let key = PromptName::new(name)?;

        self.storage
            .get(&key)
            .await?
            .ok_or_else(|| prompt_not_found(name))
    }

    /// Apply `change` to a stored prompt under the write lock and persist it
    async fn mutate<F>(&self, name: &str, change: F) -> Result<Prompt, DomainError>
    where
        F: FnOnce(&mut Prompt) -> Result<(), DomainError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut prompt = self.load_required(name).await?;

        change(&mut prompt)?;

        self.storage.update(prompt).await
    }

    fn max_results(&self, requested: Option<usize>) -> Result<usize, DomainError> {
        Ok(resolve_max_results(
            requested,
            self.config.default_max_results,
            self.config.max_results_limit,
        )?)
    }
}

fn append_version(prompt: &mut Prompt, request: CreateVersionRequest) -> VersionDetails {
    let version = prompt
        .add_version(
            request.template,
            request.commit_message,
            request.tags,
            request.response_format,
        )
        .clone();

    VersionDetails {
        aliases: prompt.aliases_for(version.version()),
        version,
    }
}

fn details_of(prompt: &Prompt, version: u32) -> Result<VersionDetails, DomainError> {
    prompt
        .version(version)
        .map(|v| VersionDetails::from_prompt(prompt, v))
        .ok_or_else(|| version_not_found(prompt.name().as_str(), version))
}

fn validate_tags(tags: &BTreeMap<String, String>) -> Result<(), DomainError> {
    for (key, value) in tags {
        validate_tag(key, value)?;
    }
    Ok(())
}

fn validate_version_request(request: &CreateVersionRequest) -> Result<(), DomainError> {
    request.template.validate()?;
    validate_tags(&request.tags)?;

    match &request.response_format {
        Some(format) if !format.is_object() => Err(DomainError::validation(
            "response_format must be a JSON object",
        )),
        _ => Ok(()),
    }
}

fn prompt_not_found(name: &str) -> DomainError {
    DomainError::not_found(format!("Prompt '{}' not found", name))
}

fn version_not_found(name: &str, version: u32) -> DomainError {
    DomainError::not_found(format!("Version {} of prompt '{}' not found", version, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::ChatMessage;
    use crate::domain::storage::mock::MockStorage;
    use crate::infrastructure::storage::InMemoryStorage;

    fn create_service() -> PromptService {
        PromptService::new(Arc::new(InMemoryStorage::<Prompt>::new()))
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_request(name: &str) -> CreatePromptRequest {
        CreatePromptRequest {
            name: name.to_string(),
            description: Some("A test prompt".to_string()),
            tags: BTreeMap::new(),
        }
    }

    fn register_request(name: &str, text: &str) -> RegisterPromptRequest {
        RegisterPromptRequest {
            name: name.to_string(),
            version: CreateVersionRequest::new(PromptTemplate::text(text)),
            description: None,
            prompt_tags: BTreeMap::new(),
        }
    }

    async fn register(service: &PromptService, name: &str, text: &str) -> u32 {
        service
            .register_prompt(register_request(name, text))
            .await
            .unwrap()
            .version
            .version()
    }

    #[tokio::test]
    async fn test_create_prompt() {
        let service = create_service();

        let prompt = service.create_prompt(create_request("summarizer")).await.unwrap();

        assert_eq!(prompt.name().as_str(), "summarizer");
        assert_eq!(prompt.description(), Some("A test prompt"));
        assert!(prompt.versions().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_prompt() {
        let service = create_service();
        service.create_prompt(create_request("dup")).await.unwrap();

        let err = service.create_prompt(create_request("dup")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
        assert!(err.to_string().contains("Prompt 'dup' already exists"));
    }

    #[tokio::test]
    async fn test_create_prompt_invalid_name() {
        let service = create_service();

        let err = service
            .create_prompt(create_request("bad name"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_prompt() {
        let service = create_service();
        service.create_prompt(create_request("p")).await.unwrap();

        let updated = service
            .update_prompt("p", Some("new description".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.description(), Some("new description"));

        service.delete_prompt("p").await.unwrap();
        assert!(service.get_prompt("p").await.unwrap().is_none());

        let err = service.delete_prompt("p").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_prompt_tags() {
        let service = create_service();
        service.create_prompt(create_request("p")).await.unwrap();

        let prompt = service.set_prompt_tag("p", "team", "nlp").await.unwrap();
        assert_eq!(prompt.tags().get("team"), Some(&"nlp".to_string()));

        let prompt = service.delete_prompt_tag("p", "team").await.unwrap();
        assert!(prompt.tags().is_empty());

        // absent tag is a no-op
        assert!(service.delete_prompt_tag("p", "team").await.is_ok());

        let err = service.set_prompt_tag("p", "", "x").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service.set_prompt_tag("missing", "k", "v").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_register_creates_prompt_and_numbers_versions() {
        let service = create_service();

        assert_eq!(register(&service, "qa", "one").await, 1);
        assert_eq!(register(&service, "qa", "two").await, 2);
        assert_eq!(register(&service, "qa", "three").await, 3);

        service.delete_prompt_version("qa", 3).await.unwrap();
        assert_eq!(register(&service, "qa", "four").await, 4);

        let prompt = service.get_prompt_required("qa").await.unwrap();
        let numbers: Vec<u32> = prompt.versions().iter().map(|v| v.version()).collect();
        assert_eq!(numbers, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_register_keeps_existing_description() {
        let service = create_service();
        service.create_prompt(create_request("p")).await.unwrap();

        let mut request = register_request("p", "text");
        request.description = Some("ignored".to_string());
        request.prompt_tags.insert("team".to_string(), "nlp".to_string());
        service.register_prompt(request).await.unwrap();

        let prompt = service.get_prompt_required("p").await.unwrap();
        assert_eq!(prompt.description(), Some("A test prompt"));
        assert_eq!(prompt.tags().get("team"), Some(&"nlp".to_string()));
    }

    #[tokio::test]
    async fn test_create_version_requires_prompt() {
        let service = create_service();

        let err = service
            .create_prompt_version("ghost", CreateVersionRequest::new(PromptTemplate::text("x")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_version_validation() {
        let service = create_service();
        service.create_prompt(create_request("p")).await.unwrap();

        let err = service
            .create_prompt_version("p", CreateVersionRequest::new(PromptTemplate::text("  ")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let mut request = CreateVersionRequest::new(PromptTemplate::text("ok"));
        request.response_format = Some(serde_json::json!("not an object"));
        let err = service.create_prompt_version("p", request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let prompt = service.get_prompt_required("p").await.unwrap();
        assert_eq!(prompt.last_version(), 0);
    }

    #[tokio::test]
    async fn test_create_chat_version_with_metadata() {
        let service = create_service();
        service.create_prompt(create_request("chat")).await.unwrap();

        let mut request = CreateVersionRequest::new(PromptTemplate::chat(vec![
            ChatMessage::system("You are {{ persona }}."),
            ChatMessage::user("{{ question }}"),
        ]));
        request.commit_message = Some("first".to_string());
        request.response_format = Some(serde_json::json!({"type": "object"}));

        let details = service.create_prompt_version("chat", request).await.unwrap();
        assert_eq!(details.version.version(), 1);
        assert_eq!(details.version.variables(), &["persona", "question"]);
        assert_eq!(details.version.commit_message(), Some("first"));
        assert!(details.aliases.is_empty());
    }

    #[tokio::test]
    async fn test_aliases_resolve_and_follow_deletes() {
        let service = create_service();
        register(&service, "p", "one").await;
        register(&service, "p", "two").await;

        let details = service.set_prompt_alias("p", "production", 1).await.unwrap();
        assert_eq!(details.aliases, vec!["production"]);

        let resolved = service
            .get_prompt_version_by_alias("p", "production")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.version.version(), 1);

        service.delete_prompt_version("p", 1).await.unwrap();
        assert!(service
            .get_prompt_version_by_alias("p", "production")
            .await
            .unwrap()
            .is_none());

        let err = service.load_prompt("prompts:/p@production").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_set_alias_errors() {
        let service = create_service();
        register(&service, "p", "one").await;

        let err = service.set_prompt_alias("p", "prod", 9).await.unwrap_err();
        assert!(err.is_not_found());

        let err = service.set_prompt_alias("p", "latest", 1).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service.set_prompt_alias("p", "v1", 1).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_version_zero_is_a_validation_error() {
        let service = create_service();
        register(&service, "p", "one").await;

        let err = service.set_prompt_alias("p", "prod", 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(service.get_prompt("p").await.unwrap().unwrap().aliases().is_empty());

        let err = service.get_prompt_version("p", 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service.delete_prompt_version("p", 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service
            .set_prompt_version_tag("p", 0, "k", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service
            .format_prompt_version("p", 0, &HashMap::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_alias() {
        let service = create_service();
        register(&service, "p", "one").await;
        service.set_prompt_alias("p", "prod", 1).await.unwrap();

        service.delete_prompt_alias("p", "prod").await.unwrap();
        let err = service.delete_prompt_alias("p", "prod").await.unwrap_err();
        assert!(err.is_not_found());

        // the version survives
        assert!(service.get_prompt_version("p", 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_load_by_version_alias_and_latest() {
        let service = create_service();
        register(&service, "p", "one").await;
        register(&service, "p", "two").await;
        service.set_prompt_alias("p", "stable", 1).await.unwrap();

        let v2 = service.load_prompt("prompts:/p/2").await.unwrap();
        assert_eq!(v2.version.template(), &PromptTemplate::text("two"));

        let stable = service.load_prompt("prompts:/p@stable").await.unwrap();
        assert_eq!(stable.version.version(), 1);

        let latest = service.load_prompt("prompts:/p@latest").await.unwrap();
        assert_eq!(latest.version.version(), 2);

        let err = service.load_prompt("prompts:/p/7").await.unwrap_err();
        assert!(err.is_not_found());

        let err = service.load_prompt("prompts:/p").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_format_prompt() {
        let service = create_service();
        register(&service, "greet", "Hello {{ name }} from {{ place }}").await;

        let result = service
            .format_prompt(
                "prompts:/greet/1",
                &values(&[("name", "Ada"), ("place", "London")]),
                false,
            )
            .await
            .unwrap();
        assert_eq!(result.formatted.as_text(), Some("Hello Ada from London"));

        let err = service
            .format_prompt("prompts:/greet/1", &values(&[("name", "Ada")]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("place"));

        let partial = service
            .format_prompt_version("greet", 1, &values(&[("name", "Ada")]), true)
            .await
            .unwrap();
        assert_eq!(
            partial.formatted.as_text(),
            Some("Hello Ada from {{ place }}")
        );
    }

    #[tokio::test]
    async fn test_version_tags() {
        let service = create_service();
        register(&service, "p", "one").await;

        let details = service
            .set_prompt_version_tag("p", 1, "reviewed", "yes")
            .await
            .unwrap();
        assert_eq!(details.version.tags().get("reviewed"), Some(&"yes".to_string()));

        let details = service
            .delete_prompt_version_tag("p", 1, "reviewed")
            .await
            .unwrap();
        assert!(details.version.tags().is_empty());

        let err = service
            .set_prompt_version_tag("p", 5, "k", "v")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_search_prompts_filter_and_pages() {
        let service = create_service();

        for (name, team) in [
            ("summarizer", "nlp"),
            ("summary-short", "nlp"),
            ("sum-vision", "vision"),
            ("translator", "nlp"),
        ] {
            let mut request = create_request(name);
            request.tags.insert("team".to_string(), team.to_string());
            service.create_prompt(request).await.unwrap();
        }

        let page = service
            .search_prompts(SearchPromptsRequest {
                filter: Some("name LIKE 'sum%' AND tags.team = 'nlp'".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["summarizer", "summary-short"]);
        assert!(page.next_page_token.is_none());

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = service
                .search_prompts(SearchPromptsRequest {
                    max_results: Some(3),
                    order_by: vec!["name DESC".to_string()],
                    page_token: token.clone(),
                    ..Default::default()
                })
                .await
                .unwrap();
            seen.extend(page.items.iter().map(|p| p.name().to_string()));

            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(
            seen,
            vec!["translator", "summary-short", "summarizer", "sum-vision"]
        );
    }

    #[tokio::test]
    async fn test_search_prompts_rejects_bad_input() {
        let service = create_service();

        for request in [
            SearchPromptsRequest {
                filter: Some("name ~ 'x'".to_string()),
                ..Default::default()
            },
            SearchPromptsRequest {
                max_results: Some(5000),
                ..Default::default()
            },
            SearchPromptsRequest {
                page_token: Some("%%%".to_string()),
                ..Default::default()
            },
            SearchPromptsRequest {
                order_by: vec!["popularity".to_string()],
                ..Default::default()
            },
        ] {
            let err = service.search_prompts(request).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation { .. }));
        }
    }

    fn search_names(page: &PagedList<Prompt>) -> Vec<String> {
        page.items.iter().map(|p| p.name().to_string()).collect()
    }

    fn ordered(clause: &str) -> SearchPromptsRequest {
        SearchPromptsRequest {
            order_by: vec![clause.to_string()],
            ..Default::default()
        }
    }

    /// A prompt whose creation and update times are both `at`
    fn prompt_stamped(name: &str, at: &str) -> Prompt {
        let mut value =
            serde_json::to_value(Prompt::new(PromptName::new(name).unwrap())).unwrap();
        value["created_at"] = serde_json::json!(at);
        value["updated_at"] = serde_json::json!(at);
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_search_orders_by_timestamps() {
        let service = create_service();

        for name in ["a", "b", "c"] {
            service.create_prompt(create_request(name)).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        service.set_prompt_tag("a", "team", "nlp").await.unwrap();

        let page = service
            .search_prompts(ordered("creation_timestamp DESC"))
            .await
            .unwrap();
        assert_eq!(search_names(&page), vec!["c", "b", "a"]);

        let page = service
            .search_prompts(ordered("creation_timestamp"))
            .await
            .unwrap();
        assert_eq!(search_names(&page), vec!["a", "b", "c"]);

        let page = service
            .search_prompts(ordered("last_updated_timestamp DESC"))
            .await
            .unwrap();
        assert_eq!(search_names(&page), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_search_timestamp_ties_break_by_name() {
        let at = "2026-01-01T00:00:00Z";
        let storage = InMemoryStorage::with_entities([
            prompt_stamped("zeta", at),
            prompt_stamped("alpha", at),
            prompt_stamped("mid", "2025-06-01T00:00:00Z"),
        ]);
        let service = PromptService::new(Arc::new(storage));

        let page = service
            .search_prompts(ordered("creation_timestamp DESC"))
            .await
            .unwrap();
        assert_eq!(search_names(&page), vec!["alpha", "zeta", "mid"]);

        let page = service
            .search_prompts(ordered("last_updated_timestamp ASC"))
            .await
            .unwrap();
        assert_eq!(search_names(&page), vec!["mid", "alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_search_versions_newest_first() {
        let service = create_service();
        for text in ["one", "two", "three"] {
            register(&service, "p", text).await;
        }
        service.set_prompt_alias("p", "prod", 2).await.unwrap();

        let page = service
            .search_prompt_versions("p", Some(2), None)
            .await
            .unwrap();
        let numbers: Vec<u32> = page.items.iter().map(|d| d.version.version()).collect();
        assert_eq!(numbers, vec![3, 2]);
        assert_eq!(page.items[1].aliases, vec!["prod"]);

        let rest = service
            .search_prompt_versions("p", Some(2), page.next_page_token.as_deref())
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].version.version(), 1);

        let err = service
            .search_prompt_versions("ghost", None, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_get_distinct_versions() {
        let service = Arc::new(create_service());
        service.create_prompt(create_request("busy")).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_prompt_version(
                            "busy",
                            CreateVersionRequest::new(PromptTemplate::text(format!("v{}", i))),
                        )
                        .await
                        .unwrap()
                        .version
                        .version()
                })
            })
            .collect();

        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap());
        }
        versions.sort_unstable();

        assert_eq!(versions, (1..=20).collect::<Vec<u32>>());
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let storage = Arc::new(MockStorage::<Prompt>::new());
        let service = PromptService::new(storage.clone());
        service.create_prompt(create_request("p")).await.unwrap();

        storage.fail_with("connection reset");

        let err = service.load_prompt("prompts:/p@latest").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));

        let err = service
            .register_prompt(register_request("p", "text"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));

        storage.recover();
        assert_eq!(service.count().await.unwrap(), 1);
    }
}
