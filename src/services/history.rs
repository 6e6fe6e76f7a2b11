//! Recent searches and saved searches.
//!
//! The recent list is newest-first, deduplicated by exact query text and
//! capped. Saved searches are only ever created explicitly and are not capped.
//! Both can be exported to JSON and imported back; an import is validated in
//! full before anything is merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::info;

use crate::domain::{SavedSearchId, SearchFilters, SortOrder};
use crate::error::SearchError;
use crate::models::{SavedSearch, SavedSearchUpdate, SearchTerm};

pub const EXPORT_VERSION: u32 = 1;

/// Serialized form produced by [`SearchHistory::export_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub recent: Vec<SearchTerm>,
    pub saved: Vec<SavedSearch>,
}

/// Counts reported back after a successful import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub recent_merged: usize,
    pub saved_added: usize,
    pub saved_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistory {
    recent: VecDeque<SearchTerm>,
    saved: Vec<SavedSearch>,
    #[serde(skip)]
    max_recent: usize,
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn require_name(name: &str) -> Result<String, SearchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SearchError::validation("saved search name cannot be empty"));
    }
    Ok(name.to_string())
}

impl SearchHistory {
    #[must_use]
    pub fn new(max_recent: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            saved: Vec::new(),
            max_recent: max_recent.max(1),
        }
    }

    /// Re-applies the cap after deserialization, where `max_recent` is skipped.
    pub fn set_max_recent(&mut self, max_recent: usize) {
        self.max_recent = max_recent.max(1);
        self.recent.truncate(self.max_recent);
    }

    /// Pushes a term to the front, removing any older entry with the same query.
    pub fn record(&mut self, term: SearchTerm) {
        if term.query.trim().is_empty() {
            return;
        }
        self.recent.retain(|t| t.query != term.query);
        self.recent.push_front(term);
        self.recent.truncate(self.max_recent);
    }

    pub fn recent(&self) -> impl Iterator<Item = &SearchTerm> {
        self.recent.iter()
    }

    #[must_use]
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Recent queries containing `needle` (case-insensitive), newest first.
    #[must_use]
    pub fn matching_recent(&self, needle: &str, limit: usize) -> Vec<&SearchTerm> {
        let needle = needle.trim().to_lowercase();
        self.recent
            .iter()
            .filter(|t| t.query.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    pub fn remove_recent(&mut self, query: &str) -> bool {
        let before = self.recent.len();
        self.recent.retain(|t| t.query != query);
        before != self.recent.len()
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    #[must_use]
    pub fn saved(&self) -> &[SavedSearch] {
        &self.saved
    }

    pub fn save_search(
        &mut self,
        name: &str,
        query: &str,
        filters: SearchFilters,
        sort: SortOrder,
        tags: Vec<String>,
    ) -> Result<SavedSearch, SearchError> {
        filters.validate()?;
        let saved = SavedSearch {
            id: SavedSearchId::new(),
            name: require_name(name)?,
            query: query.trim().to_string(),
            filters,
            sort,
            tags: normalize_tags(tags),
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.saved.push(saved.clone());
        Ok(saved)
    }

    /// Marks a saved search as used and returns a copy of it.
    pub fn touch_saved(&mut self, id: SavedSearchId) -> Result<SavedSearch, SearchError> {
        let saved = self
            .saved
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SearchError::validation(format!("saved search {id} not found")))?;
        saved.last_used_at = Some(Utc::now());
        Ok(saved.clone())
    }

    pub fn update_saved(
        &mut self,
        id: SavedSearchId,
        update: SavedSearchUpdate,
    ) -> Result<SavedSearch, SearchError> {
        let name = update.name.as_deref().map(require_name).transpose()?;
        if let Some(filters) = &update.filters {
            filters.validate()?;
        }

        let saved = self
            .saved
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SearchError::validation(format!("saved search {id} not found")))?;

        if let Some(name) = name {
            saved.name = name;
        }
        if let Some(query) = update.query {
            saved.query = query.trim().to_string();
        }
        if let Some(filters) = update.filters {
            saved.filters = filters;
        }
        if let Some(sort) = update.sort {
            saved.sort = sort;
        }
        if let Some(tags) = update.tags {
            saved.tags = normalize_tags(tags);
        }
        Ok(saved.clone())
    }

    pub fn delete_saved(&mut self, id: SavedSearchId) -> bool {
        let before = self.saved.len();
        self.saved.retain(|s| s.id != id);
        before != self.saved.len()
    }

    #[must_use]
    pub fn saved_by_tag(&self, tag: &str) -> Vec<&SavedSearch> {
        self.saved.iter().filter(|s| s.has_tag(tag)).collect()
    }

    #[must_use]
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.saved
            .iter()
            .flat_map(|s| s.tags.iter().cloned())
            .collect()
    }

    pub fn export_json(&self) -> Result<String, SearchError> {
        let export = HistoryExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            recent: self.recent.iter().cloned().collect(),
            saved: self.saved.clone(),
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| SearchError::unknown(format!("failed to serialize history: {e}")))
    }

    /// Parses and validates an export document without touching any state.
    pub fn parse_export(json: &str) -> Result<HistoryExport, SearchError> {
        let export: HistoryExport = serde_json::from_str(json)?;

        if export.version != EXPORT_VERSION {
            return Err(SearchError::validation(format!(
                "unsupported export version {} (expected {EXPORT_VERSION})",
                export.version
            )));
        }

        for term in &export.recent {
            if term.query.trim().is_empty() {
                return Err(SearchError::validation("recent search with empty query"));
            }
            term.filters.validate()?;
        }

        let mut ids = HashSet::new();
        for saved in &export.saved {
            require_name(&saved.name)?;
            saved.filters.validate()?;
            if !ids.insert(saved.id) {
                return Err(SearchError::validation(format!(
                    "duplicate saved search id {}",
                    saved.id
                )));
            }
        }

        Ok(export)
    }

    /// Validates the whole document first; on any error nothing is merged.
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary, SearchError> {
        let export = Self::parse_export(json)?;
        let mut summary = ImportSummary::default();

        let mut incoming = export.recent;
        incoming.sort_by_key(|t| t.timestamp);
        let mut merged: Vec<SearchTerm> = self.recent.drain(..).collect();
        for term in incoming {
            if let Some(pos) = merged.iter().position(|t| t.query == term.query) {
                if merged[pos].timestamp >= term.timestamp {
                    continue;
                }
                merged.remove(pos);
            }
            merged.push(term);
            summary.recent_merged += 1;
        }
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        merged.truncate(self.max_recent);
        self.recent = merged.into();

        for saved in export.saved {
            if self.saved.iter().any(|s| s.id == saved.id) {
                summary.saved_skipped += 1;
            } else {
                self.saved.push(SavedSearch {
                    tags: normalize_tags(saved.tags.clone()),
                    ..saved
                });
                summary.saved_added += 1;
            }
        }

        info!(
            "Imported history: {} recent, {} saved added, {} skipped",
            summary.recent_merged, summary.saved_added, summary.saved_skipped
        );
        Ok(summary)
    }
}
