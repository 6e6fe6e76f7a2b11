//! Autocomplete input handling on top of [`SearchStore`].
//!
//! The store owns the debounce, the request generation and the suggestion
//! list. The coordinator owns what belongs to the input box: its text, the
//! highlighted row and what happens when a suggestion is chosen.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::store::{SearchStore, SuggestionPhase};
use crate::domain::SearchRequest;
use crate::error::SearchError;
use crate::models::{SearchSuggestion, SuggestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKey {
    Down,
    Up,
    Enter,
    Escape,
}

/// What choosing a suggestion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// A text search ran for the suggestion text.
    Searched,
    /// A filter-only search ran with an empty query.
    Filtered,
    /// The caller should open the product page directly.
    Navigate {
        product_id: String,
        slug: Option<String>,
    },
    /// Nothing was selected.
    Ignored,
}

#[derive(Debug, Default)]
struct InputState {
    text: String,
    highlighted: Option<usize>,
}

pub struct SuggestionCoordinator {
    store: Arc<SearchStore>,
    input: Mutex<InputState>,
}

impl SuggestionCoordinator {
    pub fn new(store: Arc<SearchStore>) -> Self {
        Self {
            store,
            input: Mutex::new(InputState::default()),
        }
    }

    pub async fn text(&self) -> String {
        self.input.lock().await.text.clone()
    }

    /// Index of the highlighted suggestion; `None` means nothing is highlighted.
    pub async fn highlighted(&self) -> Option<usize> {
        self.input.lock().await.highlighted
    }

    /// Handles a keystroke that changed the input text.
    ///
    /// Returns `None` when a later keystroke superseded this one.
    pub async fn on_input(&self, text: &str) -> Option<SuggestionPhase> {
        {
            let mut input = self.input.lock().await;
            input.text = text.to_string();
            input.highlighted = None;
        }
        self.store.get_suggestions(text).await
    }

    /// Hides the list without touching the input text.
    pub async fn blur(&self) {
        self.input.lock().await.highlighted = None;
        self.store.cancel_suggestions().await;
    }

    pub async fn on_key(&self, key: NavigationKey) -> Result<SelectionOutcome, SearchError> {
        let suggestions = self.store.suggestions().await;

        match key {
            NavigationKey::Down => {
                let mut input = self.input.lock().await;
                input.highlighted = move_down(input.highlighted, suggestions.len());
                Ok(SelectionOutcome::Ignored)
            }
            NavigationKey::Up => {
                let mut input = self.input.lock().await;
                input.highlighted = move_up(input.highlighted);
                Ok(SelectionOutcome::Ignored)
            }
            NavigationKey::Escape => {
                self.blur().await;
                Ok(SelectionOutcome::Ignored)
            }
            NavigationKey::Enter => {
                let highlighted = self.input.lock().await.highlighted;
                match highlighted.and_then(|i| suggestions.get(i)) {
                    Some(suggestion) => self.select(suggestion).await,
                    None => Ok(SelectionOutcome::Ignored),
                }
            }
        }
    }

    /// Acts on a chosen suggestion according to its type.
    pub async fn select(&self, suggestion: &SearchSuggestion) -> Result<SelectionOutcome, SearchError> {
        let metadata_id = suggestion.metadata.as_ref().map(|m| m.id.clone());

        match suggestion.kind {
            SuggestionType::Product => {
                if let Some(metadata) = &suggestion.metadata {
                    debug!("Navigating to product {}", metadata.id);
                    self.blur().await;
                    return Ok(SelectionOutcome::Navigate {
                        product_id: metadata.id.clone(),
                        slug: metadata.slug.clone(),
                    });
                }
                self.search_text(&suggestion.text).await
            }
            SuggestionType::Query => self.search_text(&suggestion.text).await,
            SuggestionType::Category | SuggestionType::Vendor => {
                let id = metadata_id.unwrap_or_else(|| suggestion.text.clone());
                let mut filters = self.store.filters().await;
                if suggestion.kind == SuggestionType::Category {
                    filters.categories.insert(id);
                } else {
                    filters.vendor_ids.insert(id);
                }

                self.input.lock().await.text.clear();
                self.blur().await;
                self.store
                    .search(SearchRequest::query(String::new()).with_filters(filters))
                    .await?;
                Ok(SelectionOutcome::Filtered)
            }
        }
    }

    async fn search_text(&self, text: &str) -> Result<SelectionOutcome, SearchError> {
        self.input.lock().await.text = text.to_string();
        self.blur().await;
        self.store.search(SearchRequest::query(text)).await?;
        Ok(SelectionOutcome::Searched)
    }
}

const fn move_down(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None => Some(0),
        Some(i) if i + 1 < len => Some(i + 1),
        Some(_) => Some(len - 1),
    }
}

const fn move_up(current: Option<usize>) -> Option<usize> {
    match current {
        None | Some(0) => None,
        Some(i) => Some(i - 1),
    }
}
