use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{SavedSearchId, SearchFilters, SortOrder};

/// One completed search with a non-empty query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTerm {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub result_count: u64,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: SavedSearchId,
    pub name: String,
    pub query: String,
    pub filters: SearchFilters,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl SavedSearch {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Partial update for a saved search. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SavedSearchUpdate {
    pub name: Option<String>,
    pub query: Option<String>,
    pub filters: Option<SearchFilters>,
    pub sort: Option<SortOrder>,
    pub tags: Option<Vec<String>>,
}
