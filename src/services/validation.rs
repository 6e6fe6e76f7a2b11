use regex::Regex;
use std::sync::OnceLock;

use crate::config::SearchConfig;
use crate::error::SearchError;

fn disallowed() -> Option<&'static Regex> {
    static INSTANCE: OnceLock<Option<Regex>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Regex::new(r"[<>{}\[\]\\`;]|\p{Cc}").ok())
        .as_ref()
}

fn whitespace() -> Option<&'static Regex> {
    static INSTANCE: OnceLock<Option<Regex>> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"\s+").ok()).as_ref()
}

/// Checks query text before it reaches the network.
#[derive(Debug, Clone, Copy)]
pub struct QueryValidator {
    min_len: usize,
    max_len: usize,
}

impl QueryValidator {
    #[must_use]
    pub const fn new(min_len: usize, max_len: usize) -> Self {
        Self { min_len, max_len }
    }

    #[must_use]
    pub const fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.min_query_length, config.max_query_length)
    }

    /// Returns the normalized query (trimmed, inner whitespace collapsed).
    ///
    /// An empty query is valid: it means a filter-only search.
    pub fn validate(&self, query: &str) -> Result<String, SearchError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }

        let normalized = whitespace().map_or_else(
            || trimmed.to_string(),
            |re| re.replace_all(trimmed, " ").into_owned(),
        );

        let len = normalized.chars().count();
        if len < self.min_len {
            return Err(SearchError::validation(format!(
                "query must be at least {} characters",
                self.min_len
            )));
        }
        if len > self.max_len {
            return Err(SearchError::validation(format!(
                "query must be at most {} characters",
                self.max_len
            )));
        }
        if disallowed().is_some_and(|re| re.is_match(&normalized)) {
            return Err(SearchError::validation(
                "query contains characters that are not allowed",
            ));
        }

        Ok(normalized)
    }
}
