//! Prompt name, alias, tag and version validation

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::DomainError;

/// Maximum length for prompt names
pub const MAX_PROMPT_NAME_LENGTH: usize = 255;

/// Maximum length for alias names
pub const MAX_ALIAS_LENGTH: usize = 255;

/// Maximum length for tag keys
pub const MAX_TAG_KEY_LENGTH: usize = 250;

/// Maximum length for tag values
pub const MAX_TAG_VALUE_LENGTH: usize = 5000;

/// Alias that always resolves to the newest version and cannot be assigned
pub const LATEST_ALIAS: &str = "latest";

static PROMPT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.\-]+$").unwrap());

static ALIAS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").unwrap());

/// Aliases shaped like `v1`, `V42` would be ambiguous with version references
static VERSION_LIKE_ALIAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[vV]\d+$").unwrap());

/// Prompt validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptValidationError {
    #[error("Prompt name cannot be empty")]
    EmptyName,

    #[error("Prompt name too long: {length} characters (max {max})")]
    NameTooLong { length: usize, max: usize },

    #[error(
        "Invalid prompt name '{name}': only alphanumerics, underscores, periods and hyphens are allowed"
    )]
    InvalidName { name: String },

    #[error("Alias cannot be empty")]
    EmptyAlias,

    #[error("Alias too long: {length} characters (max {max})")]
    AliasTooLong { length: usize, max: usize },

    #[error("Invalid alias '{alias}': only alphanumerics, underscores and hyphens are allowed")]
    InvalidAlias { alias: String },

    #[error("Alias '{alias}' is reserved")]
    ReservedAlias { alias: String },

    #[error("Alias '{alias}' looks like a version reference and cannot be used")]
    VersionLikeAlias { alias: String },

    #[error("Tag key cannot be empty")]
    EmptyTagKey,

    #[error("Tag key too long: {length} characters (max {max})")]
    TagKeyTooLong { length: usize, max: usize },

    #[error("Tag value for '{key}' too long: {length} characters (max {max})")]
    TagValueTooLong {
        key: String,
        length: usize,
        max: usize,
    },

    #[error("Invalid version '{version}': must be a positive integer")]
    InvalidVersion { version: String },
}

impl From<PromptValidationError> for DomainError {
    fn from(error: PromptValidationError) -> Self {
        DomainError::validation(error.to_string())
    }
}

/// Validate a prompt name
pub fn validate_prompt_name(name: &str) -> Result<(), PromptValidationError> {
    if name.is_empty() {
        return Err(PromptValidationError::EmptyName);
    }

    if name.len() > MAX_PROMPT_NAME_LENGTH {
        return Err(PromptValidationError::NameTooLong {
            length: name.len(),
            max: MAX_PROMPT_NAME_LENGTH,
        });
    }

    if !PROMPT_NAME_PATTERN.is_match(name) {
        return Err(PromptValidationError::InvalidName {
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Validate an alias that is about to be assigned
pub fn validate_alias(alias: &str) -> Result<(), PromptValidationError> {
    if alias.is_empty() {
        return Err(PromptValidationError::EmptyAlias);
    }

    if alias.len() > MAX_ALIAS_LENGTH {
        return Err(PromptValidationError::AliasTooLong {
            length: alias.len(),
            max: MAX_ALIAS_LENGTH,
        });
    }

    if !ALIAS_PATTERN.is_match(alias) {
        return Err(PromptValidationError::InvalidAlias {
            alias: alias.to_string(),
        });
    }

    if alias.eq_ignore_ascii_case(LATEST_ALIAS) {
        return Err(PromptValidationError::ReservedAlias {
            alias: alias.to_string(),
        });
    }

    if VERSION_LIKE_ALIAS.is_match(alias) {
        return Err(PromptValidationError::VersionLikeAlias {
            alias: alias.to_string(),
        });
    }

    Ok(())
}

/// Validate a tag key/value pair
pub fn validate_tag(key: &str, value: &str) -> Result<(), PromptValidationError> {
    if key.trim().is_empty() {
        return Err(PromptValidationError::EmptyTagKey);
    }

    if key.len() > MAX_TAG_KEY_LENGTH {
        return Err(PromptValidationError::TagKeyTooLong {
            length: key.len(),
            max: MAX_TAG_KEY_LENGTH,
        });
    }

    if value.len() > MAX_TAG_VALUE_LENGTH {
        return Err(PromptValidationError::TagValueTooLong {
            key: key.to_string(),
            length: value.len(),
            max: MAX_TAG_VALUE_LENGTH,
        });
    }

    Ok(())
}

/// Version numbers start at 1
pub fn validate_version(version: u32) -> Result<(), PromptValidationError> {
    if version == 0 {
        return Err(PromptValidationError::InvalidVersion {
            version: version.to_string(),
        });
    }

    Ok(())
}

/// Parse a version number from its string form
pub fn parse_version(version: &str) -> Result<u32, PromptValidationError> {
    match version.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(PromptValidationError::InvalidVersion {
            version: version.to_string(),
        }),
    }
}
