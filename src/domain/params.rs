//! Full and partial search parameters.

use serde::Serialize;
use std::time::Duration;

use super::{SearchFilters, SortOrder};

/// Complete description of one search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: SortOrder,
    pub page: u32,
    pub limit: u32,
    /// Per-request timeout; the client default applies when `None`.
    pub timeout: Option<Duration>,
}

#[derive(Serialize)]
struct CacheKey<'a> {
    q: &'a str,
    filters: &'a SearchFilters,
    sort: SortOrder,
    page: u32,
    limit: u32,
}

impl SearchParams {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            sort: SortOrder::default(),
            page: 1,
            limit,
            timeout: None,
        }
    }

    /// Serialized form used as the result cache key. The timeout is not part
    /// of the identity of a search.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let key = CacheKey {
            q: self.query.trim(),
            filters: &self.filters,
            sort: self.sort,
            page: self.page,
            limit: self.limit,
        };
        serde_json::to_string(&key).unwrap_or_else(|_| {
            format!("{}|{}|{}|{}", key.q, key.sort, key.page, key.limit)
        })
    }

    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Partial parameters merged over the store's current state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub filters: Option<SearchFilters>,
    pub sort: Option<SortOrder>,
    /// Defaults to the first page when omitted.
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    #[must_use]
    pub const fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn merge_over(self, current: &SearchParams) -> SearchParams {
        SearchParams {
            query: self.query.unwrap_or_else(|| current.query.clone()),
            filters: self.filters.unwrap_or_else(|| current.filters.clone()),
            sort: self.sort.unwrap_or(current.sort),
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(current.limit),
            timeout: self.timeout,
        }
    }
}
