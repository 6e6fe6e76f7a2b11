//! Infinite scroll driven by a sentinel below the result list.

use std::sync::Arc;
use tracing::debug;

use super::store::SearchStore;
use crate::config::ScrollConfig;
use crate::error::SearchError;
use crate::models::SearchResult;

/// One visibility observation of the sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelEntry {
    pub is_intersecting: bool,
    /// Pixels between the sentinel and the bottom of the viewport.
    /// Zero or negative once the sentinel is on screen.
    pub distance_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScrollOutcome {
    OutOfView,
    /// In view, but there is no next page or a load is already running.
    Skipped,
    Loaded(Arc<SearchResult>),
}

pub struct InfiniteScroll {
    store: Arc<SearchStore>,
    root_margin_px: f64,
}

impl InfiniteScroll {
    pub fn new(store: Arc<SearchStore>, config: &ScrollConfig) -> Self {
        Self {
            store,
            root_margin_px: config.root_margin_px.max(0.0),
        }
    }

    #[must_use]
    pub fn is_within_margin(&self, entry: &SentinelEntry) -> bool {
        entry.is_intersecting || entry.distance_px <= self.root_margin_px
    }

    /// Requests the next page when the sentinel comes within the margin.
    ///
    /// Rapid repeated observations are safe: the store drops `load_more`
    /// calls while one is in flight.
    pub async fn on_visibility(&self, entry: SentinelEntry) -> Result<ScrollOutcome, SearchError> {
        if !self.is_within_margin(&entry) {
            return Ok(ScrollOutcome::OutOfView);
        }
        if !self.store.can_load_more().await {
            debug!("Sentinel visible but nothing to load");
            return Ok(ScrollOutcome::Skipped);
        }

        Ok(match self.store.load_more().await? {
            Some(result) => ScrollOutcome::Loaded(result),
            None => ScrollOutcome::Skipped,
        })
    }
}
