//! Prompt search: filter strings, ordering and pagination
//!
//! Filter grammar:
//! ```text
//! filter     := clause ( AND clause )*
//! clause     := attribute comparator string
//! attribute  := name | tags.<key> | tags.`<key>`
//! comparator := = | != | LIKE | ILIKE
//! ```

use std::cmp::Ordering;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::Prompt;
use crate::domain::DomainError;

/// Search errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("Invalid order_by clause '{clause}'")]
    InvalidOrderBy { clause: String },

    #[error("Invalid page token")]
    InvalidPageToken,

    #[error("Invalid max_results {value}: must be between 1 and {max}")]
    InvalidMaxResults { value: usize, max: usize },
}

impl From<SearchError> for DomainError {
    fn from(error: SearchError) -> Self {
        DomainError::validation(error.to_string())
    }
}

fn invalid_filter(message: impl Into<String>) -> SearchError {
    SearchError::InvalidFilter {
        message: message.into(),
    }
}

/// Attribute a filter clause compares against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAttribute {
    Name,
    Tag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Like,
    ILike,
}

/// A single `attribute comparator value` clause
#[derive(Debug, Clone)]
pub struct FilterCondition {
    pub attribute: FilterAttribute,
    pub comparator: Comparator,
    pub value: String,
    /// Compiled pattern for LIKE / ILIKE
    pattern: Option<Regex>,
}

impl FilterCondition {
    pub fn new(
        attribute: FilterAttribute,
        comparator: Comparator,
        value: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let value = value.into();
        let pattern = match comparator {
            Comparator::Like => Some(like_to_regex(&value, false)?),
            Comparator::ILike => Some(like_to_regex(&value, true)?),
            Comparator::Eq | Comparator::Ne => None,
        };

        Ok(Self {
            attribute,
            comparator,
            value,
            pattern,
        })
    }

    pub fn matches(&self, prompt: &Prompt) -> bool {
        let candidate = match &self.attribute {
            FilterAttribute::Name => prompt.name().as_str(),
            FilterAttribute::Tag(key) => match prompt.tags().get(key) {
                Some(value) => value.as_str(),
                None => return false,
            },
        };

        match (self.comparator, &self.pattern) {
            (Comparator::Eq, _) => candidate == self.value,
            (Comparator::Ne, _) => candidate != self.value,
            (_, Some(pattern)) => pattern.is_match(candidate),
            (_, None) => false,
        }
    }
}

/// Convert a SQL LIKE pattern (`%`, `_`) to an anchored regex
fn like_to_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, SearchError> {
    let mut regex = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });

    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');

    Regex::new(&regex).map_err(|e| invalid_filter(format!("bad LIKE pattern: {}", e)))
}

/// Parsed filter; an empty filter matches every prompt
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    conditions: Vec<FilterCondition>,
}

impl SearchFilter {
    pub fn parse(filter: &str) -> Result<Self, SearchError> {
        let tokens = tokenize(filter)?;
        let mut parser = FilterParser { tokens, pos: 0 };
        let conditions = parser.parse()?;
        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn matches(&self, prompt: &Prompt) -> bool {
        self.conditions.iter().all(|c| c.matches(prompt))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Backticked(String),
    Dot,
    Eq,
    Ne,
}

fn tokenize(input: &str) -> Result<Vec<Token>, SearchError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' | '`' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;

                for next in chars.by_ref() {
                    if next == c {
                        closed = true;
                        break;
                    }
                    value.push(next);
                }

                if !closed {
                    return Err(invalid_filter(format!("unterminated {} quote", c)));
                }

                tokens.push(if c == '`' {
                    Token::Backticked(value)
                } else {
                    Token::Quoted(value)
                });
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(invalid_filter("expected '=' after '!'"));
                }
                tokens.push(Token::Ne);
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' => {
                let mut word = String::new();

                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '-' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(invalid_filter(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct FilterParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl FilterParser {
    fn parse(&mut self) -> Result<Vec<FilterCondition>, SearchError> {
        let mut conditions = Vec::new();

        if self.tokens.is_empty() {
            return Ok(conditions);
        }

        loop {
            conditions.push(self.parse_clause()?);

            match self.next() {
                None => break,
                Some(Token::Word(word)) if word.eq_ignore_ascii_case("and") => continue,
                Some(other) => {
                    return Err(invalid_filter(format!(
                        "expected AND between clauses, found {:?}",
                        other
                    )));
                }
            }
        }

        Ok(conditions)
    }

    fn parse_clause(&mut self) -> Result<FilterCondition, SearchError> {
        let attribute = self.parse_attribute()?;

        let comparator = match self.next() {
            Some(Token::Eq) => Comparator::Eq,
            Some(Token::Ne) => Comparator::Ne,
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("like") => Comparator::Like,
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("ilike") => Comparator::ILike,
            other => {
                return Err(invalid_filter(format!(
                    "expected comparator (=, !=, LIKE, ILIKE), found {:?}",
                    other
                )));
            }
        };

        let value = match self.next() {
            Some(Token::Quoted(value)) => value,
            other => {
                return Err(invalid_filter(format!(
                    "expected quoted string value, found {:?}",
                    other
                )));
            }
        };

        FilterCondition::new(attribute, comparator, value)
    }

    fn parse_attribute(&mut self) -> Result<FilterAttribute, SearchError> {
        match self.next() {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("name") => {
                Ok(FilterAttribute::Name)
            }
            Some(Token::Word(word))
                if word.eq_ignore_ascii_case("tags") || word.eq_ignore_ascii_case("tag") =>
            {
                if self.next() != Some(Token::Dot) {
                    return Err(invalid_filter("expected '.' after 'tags'"));
                }
                self.parse_tag_key().map(FilterAttribute::Tag)
            }
            other => Err(invalid_filter(format!(
                "expected 'name' or 'tags.<key>', found {:?}",
                other
            ))),
        }
    }

    fn parse_tag_key(&mut self) -> Result<String, SearchError> {
        match self.next() {
            Some(Token::Backticked(key)) if !key.is_empty() => Ok(key),
            Some(Token::Word(first)) => {
                let mut key = first;

                // Unquoted keys may contain dots: tags.owner.team
                while self.peek() == Some(&Token::Dot) {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Word(part)) => {
                            key.push('.');
                            key.push_str(&part);
                        }
                        _ => return Err(invalid_filter("incomplete tag key")),
                    }
                }
                Ok(key)
            }
            _ => Err(invalid_filter("missing tag key")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }
}

/// Sortable prompt attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Name,
    CreationTimestamp,
    LastUpdatedTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: OrderField,
    pub descending: bool,
}

impl OrderBy {
    /// Parse a clause like `name`, `creation_timestamp DESC`
    pub fn parse(clause: &str) -> Result<Self, SearchError> {
        let invalid = || SearchError::InvalidOrderBy {
            clause: clause.to_string(),
        };
        let mut parts = clause.split_whitespace();

        let field = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("name") => OrderField::Name,
            Some("creation_timestamp") | Some("timestamp") => OrderField::CreationTimestamp,
            Some("last_updated_timestamp") => OrderField::LastUpdatedTimestamp,
            _ => return Err(invalid()),
        };

        let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            _ => return Err(invalid()),
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { field, descending })
    }

    /// Parse every clause; no clauses means `name ASC`
    pub fn parse_all(clauses: &[String]) -> Result<Vec<Self>, SearchError> {
        clauses
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| Self::parse(c))
            .collect()
    }

    fn compare(&self, a: &Prompt, b: &Prompt) -> Ordering {
        let ordering = match self.field {
            OrderField::Name => a.name().cmp(b.name()),
            OrderField::CreationTimestamp => a.created_at().cmp(&b.created_at()),
            OrderField::LastUpdatedTimestamp => a.updated_at().cmp(&b.updated_at()),
        };

        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Sort prompts by the given clauses, breaking ties by name ascending
pub fn sort_prompts(prompts: &mut [Prompt], order_by: &[OrderBy]) {
    prompts.sort_by(|a, b| {
        order_by
            .iter()
            .map(|o| o.compare(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.name().cmp(b.name()))
    });
}

/// A page of results with an optional continuation token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> PagedList<T> {
    /// Cut one page out of a fully sorted result set
    pub fn paginate(items: Vec<T>, offset: usize, max_results: usize) -> Self {
        let total = items.len();
        let end = offset.saturating_add(max_results).min(total);

        let next_page_token = (end < total).then(|| PageToken { offset: end }.encode());
        let items = items
            .into_iter()
            .skip(offset)
            .take(max_results)
            .collect();

        Self {
            items,
            next_page_token,
        }
    }
}

/// Opaque pagination token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub offset: usize,
}

impl PageToken {
    pub fn encode(&self) -> String {
        // Serializing a struct with one integer field cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, SearchError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| SearchError::InvalidPageToken)?;
        serde_json::from_slice(&bytes).map_err(|_| SearchError::InvalidPageToken)
    }

    /// Offset for an optional token; a missing token starts at the beginning
    pub fn offset_of(token: Option<&str>) -> Result<usize, SearchError> {
        match token {
            None | Some("") => Ok(0),
            Some(token) => Ok(Self::decode(token)?.offset),
        }
    }
}

/// Apply default and upper bound to a requested page size
pub fn resolve_max_results(
    requested: Option<usize>,
    default: usize,
    limit: usize,
) -> Result<usize, SearchError> {
    match requested {
        None => Ok(default.min(limit)),
        Some(value) if value == 0 || value > limit => {
            Err(SearchError::InvalidMaxResults { value, max: limit })
        }
        Some(value) => Ok(value),
    }
}
