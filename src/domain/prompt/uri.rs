//! Prompt URIs: `prompts:/name/version` and `prompts:/name@alias`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::validation::{
    parse_version, validate_alias, validate_prompt_name, PromptValidationError, LATEST_ALIAS,
};
use crate::domain::DomainError;

/// URI scheme prefix for prompt references
pub const PROMPT_URI_SCHEME: &str = "prompts:/";

/// Errors produced while parsing a prompt URI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptUriError {
    #[error("Invalid prompt URI '{uri}': must start with 'prompts:/'")]
    MissingScheme { uri: String },

    #[error("Invalid prompt URI '{uri}': expected 'prompts:/<name>/<version>' or 'prompts:/<name>@<alias>'")]
    MissingReference { uri: String },

    #[error("Invalid prompt URI '{uri}': {source}")]
    Invalid {
        uri: String,
        #[source]
        source: PromptValidationError,
    },
}

impl From<PromptUriError> for DomainError {
    fn from(error: PromptUriError) -> Self {
        DomainError::validation(error.to_string())
    }
}

/// What a URI points at within a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReference {
    Version(u32),
    Alias(String),
    /// The highest existing version
    Latest,
}

impl fmt::Display for PromptReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(version) => write!(f, "version {}", version),
            Self::Alias(alias) => write!(f, "alias '{}'", alias),
            Self::Latest => write!(f, "latest version"),
        }
    }
}

/// Parsed prompt URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptUri {
    pub name: String,
    pub reference: PromptReference,
}

impl PromptUri {
    pub fn new(name: impl Into<String>, reference: PromptReference) -> Self {
        Self {
            name: name.into(),
            reference,
        }
    }

    /// Parse a URI string
    pub fn parse(uri: &str) -> Result<Self, PromptUriError> {
        let rest = uri
            .strip_prefix(PROMPT_URI_SCHEME)
            .ok_or_else(|| PromptUriError::MissingScheme {
                uri: uri.to_string(),
            })?;

        let invalid = |source: PromptValidationError| PromptUriError::Invalid {
            uri: uri.to_string(),
            source,
        };

        let (name, reference) = if let Some((name, alias)) = rest.split_once('@') {
            let reference = if alias.eq_ignore_ascii_case(LATEST_ALIAS) {
                PromptReference::Latest
            } else {
                validate_alias(alias).map_err(invalid)?;
                PromptReference::Alias(alias.to_string())
            };
            (name, reference)
        } else if let Some((name, version)) = rest.split_once('/') {
            let version = parse_version(version).map_err(invalid)?;
            (name, PromptReference::Version(version))
        } else {
            return Err(PromptUriError::MissingReference {
                uri: uri.to_string(),
            });
        };

        validate_prompt_name(name).map_err(invalid)?;

        Ok(Self::new(name, reference))
    }
}

impl FromStr for PromptUri {
    type Err = PromptUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PromptUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            PromptReference::Version(version) => {
                write!(f, "{}{}/{}", PROMPT_URI_SCHEME, self.name, version)
            }
            PromptReference::Alias(alias) => write!(f, "{}{}@{}", PROMPT_URI_SCHEME, self.name, alias),
            PromptReference::Latest => {
                write!(f, "{}{}@{}", PROMPT_URI_SCHEME, self.name, LATEST_ALIAS)
            }
        }
    }
}
