//! The search session store.
//!
//! `SearchStore` is the single owner of query text, filters, sort, pagination,
//! results, cache, suggestions and history. Callers change it only through the
//! action methods below; every action emits a [`StoreEvent`] for subscribers.
//!
//! State mutations are synchronous sections under one lock. The lock is never
//! held across a network call, so network completions interleave with other
//! actions the same way UI callbacks would. Two ordering rules apply:
//!
//! * searches carry a generation number, and a response is only applied if no
//!   newer search (or clear) started in the meantime;
//! * `load_more` is guarded by a busy flag: extra triggers while a page is in
//!   flight are dropped, not queued.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::cache::ResultCache;
use super::history::{ImportSummary, SearchHistory};
use super::persistence::{PersistedState, STATE_VERSION, StateStorage, load_state, save_state};
use super::url_sync::UrlState;
use super::validation::QueryValidator;
use crate::clients::search_api::{NoResultsReport, SearchAnalytics, SearchApi};
use crate::config::{Config, SearchConfig, SuggestionConfig};
use crate::domain::events::StoreEvent;
use crate::domain::{
    FilterKey, FilterUpdate, FilterValue, SavedSearchId, SearchFilters, SearchParams,
    SearchRequest, SortOrder, ViewMode,
};
use crate::error::SearchError;
use crate::models::{
    FilterOptions, SavedSearch, SavedSearchUpdate, SearchResult, SearchSuggestion, SearchTerm,
};

const EVENT_BUFFER: usize = 64;

/// Where the autocomplete pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionPhase {
    #[default]
    Idle,
    Debouncing,
    Fetching,
    Populated,
    Empty,
    Error,
}

/// Read-only copy of the observable state.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: SortOrder,
    pub page: u32,
    pub limit: u32,
    pub view_mode: ViewMode,
    pub results: Option<Arc<SearchResult>>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<SearchError>,
    pub suggestions: Vec<SearchSuggestion>,
    pub suggestion_query: String,
    pub suggestion_phase: SuggestionPhase,
    pub filter_options: FilterOptions,
}

impl StoreSnapshot {
    #[must_use]
    pub fn active_filters_count(&self) -> usize {
        self.filters.active_count()
    }

    #[must_use]
    pub fn can_load_more(&self) -> bool {
        !self.is_loading
            && !self.is_loading_more
            && self
                .results
                .as_ref()
                .is_some_and(|r| r.pagination.has_next)
    }

    #[must_use]
    pub fn total_products(&self) -> u64 {
        self.results.as_ref().map_or(0, |r| r.total_found())
    }
}

struct StoreState {
    params: SearchParams,
    view_mode: ViewMode,
    results: Option<Arc<SearchResult>>,
    is_loading: bool,
    is_loading_more: bool,
    error: Option<SearchError>,
    suggestions: Vec<SearchSuggestion>,
    suggestion_query: String,
    suggestion_phase: SuggestionPhase,
    filter_options: FilterOptions,
    cache: ResultCache,
    history: SearchHistory,
}

impl StoreState {
    fn persisted(&self) -> PersistedState {
        PersistedState {
            version: STATE_VERSION,
            filters: self.params.filters.clone(),
            sort: self.params.sort,
            view_mode: self.view_mode,
            limit: Some(self.params.limit),
            history: self.history.clone(),
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            query: self.params.query.clone(),
            filters: self.params.filters.clone(),
            sort: self.params.sort,
            page: self.params.page,
            limit: self.params.limit,
            view_mode: self.view_mode,
            results: self.results.clone(),
            is_loading: self.is_loading,
            is_loading_more: self.is_loading_more,
            error: self.error.clone(),
            suggestions: self.suggestions.clone(),
            suggestion_query: self.suggestion_query.clone(),
            suggestion_phase: self.suggestion_phase,
            filter_options: self.filter_options.clone(),
        }
    }

    fn record_history(&mut self, params: &SearchParams, result: &SearchResult) {
        if params.query.is_empty() {
            return;
        }
        self.history.record(SearchTerm {
            query: params.query.clone(),
            timestamp: Utc::now(),
            result_count: result.total_found(),
            filters: params.filters.clone(),
        });
    }
}

pub struct SearchStore {
    api: Arc<dyn SearchApi>,
    storage: Arc<dyn StateStorage>,
    search_config: SearchConfig,
    suggestion_config: SuggestionConfig,
    validator: QueryValidator,
    state: RwLock<StoreState>,
    search_generation: AtomicU64,
    suggestion_generation: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
    telemetry: Mutex<JoinSet<()>>,
}

impl SearchStore {
    /// Creates a store, restoring persisted preferences and history.
    pub fn new(api: Arc<dyn SearchApi>, storage: Arc<dyn StateStorage>, config: &Config) -> Self {
        let search_config = config.search.clone();
        let mut params = SearchParams::new(search_config.default_limit);
        let mut history = SearchHistory::new(config.history.max_recent);
        let mut view_mode = ViewMode::default();

        if let Some(persisted) = load_state(storage.as_ref()) {
            debug!("Restored persisted search state");
            params.filters = persisted.filters;
            params.sort = persisted.sort;
            if let Some(limit) = persisted.limit {
                params.limit = limit.clamp(1, search_config.max_limit.max(1));
            }
            view_mode = persisted.view_mode;
            history = persisted.history;
            history.set_max_recent(config.history.max_recent);
        }

        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            api,
            storage,
            validator: QueryValidator::from_config(&search_config),
            state: RwLock::new(StoreState {
                params,
                view_mode,
                results: None,
                is_loading: false,
                is_loading_more: false,
                error: None,
                suggestions: Vec::new(),
                suggestion_query: String::new(),
                suggestion_phase: SuggestionPhase::Idle,
                filter_options: FilterOptions::default(),
                cache: ResultCache::new(search_config.cache_ttl(), search_config.max_cache_entries),
                history,
            }),
            search_config,
            suggestion_config: config.suggestions.clone(),
            search_generation: AtomicU64::new(0),
            suggestion_generation: AtomicU64::new(0),
            events,
            telemetry: Mutex::new(JoinSet::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.events.send(event);
    }

    fn persist(&self, state: &StoreState) {
        if let Err(e) = save_state(self.storage.as_ref(), &state.persisted()) {
            warn!("Failed to persist search state: {e:#}");
        }
    }

    fn spawn_telemetry(&self, params: &SearchParams, result: &SearchResult) {
        let api = Arc::clone(&self.api);
        let analytics = SearchAnalytics {
            query: params.query.clone(),
            filters: params.filters.clone(),
            result_count: result.total_found(),
            search_time_ms: result.search_time_ms,
            timestamp: Utc::now(),
        };
        let no_results = (!params.query.is_empty() && result.products.is_empty()).then(|| {
            NoResultsReport {
                query: params.query.clone(),
                filters: params.filters.clone(),
                timestamp: Utc::now(),
            }
        });

        let mut tasks = self.telemetry.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = api.track_search(&analytics).await {
                warn!("Search analytics not recorded: {e}");
            }
            if let Some(report) = no_results
                && let Err(e) = api.report_no_results(&report).await
            {
                warn!("No-results report not recorded: {e}");
            }
        });
    }

    /// Waits up to `limit` for telemetry posts still in flight. Posts that
    /// have not finished by then are abandoned. Returns how many were
    /// abandoned.
    pub async fn flush_telemetry(&self, limit: Duration) -> usize {
        let mut tasks = std::mem::take(
            &mut *self.telemetry.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if tasks.is_empty() {
            return 0;
        }

        let drained = tokio::time::timeout(limit, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Abandoning {} telemetry post(s) after {:?}", tasks.len(), limit);
        }
        tasks.len()
    }

    // ----------------------------------------------------------------------
    // Selectors
    // ----------------------------------------------------------------------

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn results(&self) -> Option<Arc<SearchResult>> {
        self.state.read().await.results.clone()
    }

    pub async fn filters(&self) -> SearchFilters {
        self.state.read().await.params.filters.clone()
    }

    pub async fn error(&self) -> Option<SearchError> {
        self.state.read().await.error.clone()
    }

    pub async fn is_loading(&self) -> bool {
        let state = self.state.read().await;
        state.is_loading || state.is_loading_more
    }

    pub async fn active_filters_count(&self) -> usize {
        self.state.read().await.params.filters.active_count()
    }

    pub async fn is_filter_active(&self, key: &FilterKey) -> bool {
        self.state.read().await.params.filters.is_active(key)
    }

    pub async fn can_load_more(&self) -> bool {
        self.snapshot().await.can_load_more()
    }

    pub async fn suggestions(&self) -> Vec<SearchSuggestion> {
        self.state.read().await.suggestions.clone()
    }

    pub async fn recent_searches(&self) -> Vec<SearchTerm> {
        self.state.read().await.history.recent().cloned().collect()
    }

    pub async fn saved_searches(&self) -> Vec<SavedSearch> {
        self.state.read().await.history.saved().to_vec()
    }

    pub async fn all_tags(&self) -> Vec<String> {
        self.state.read().await.history.all_tags().into_iter().collect()
    }

    pub async fn saved_searches_by_tag(&self, tag: &str) -> Vec<SavedSearch> {
        self.state
            .read()
            .await
            .history
            .saved_by_tag(tag)
            .into_iter()
            .cloned()
            .collect()
    }

    // ----------------------------------------------------------------------
    // Search
    // ----------------------------------------------------------------------

    /// Runs a search with `request` merged over the current parameters.
    ///
    /// A first-page request whose parameters are cached and fresh is answered
    /// from the cache without a network call. Otherwise the remote API is
    /// queried; page 1 replaces the result list and later pages append to it.
    /// Failures land in the error slot and leave existing results untouched.
    pub async fn search(&self, request: SearchRequest) -> Result<Arc<SearchResult>, SearchError> {
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let params = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;

            let mut params = request.merge_over(&state.params);
            params.limit = params.limit.clamp(1, self.search_config.max_limit.max(1));
            match self.validator.validate(&params.query) {
                Ok(query) => params.query = query,
                Err(e) => {
                    state.error = Some(e.clone());
                    state.is_loading = false;
                    drop(guard);
                    self.emit(StoreEvent::SearchFailed {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            }

            state.params = params.clone();
            state.error = None;

            if params.page == 1
                && let Some(hit) = state.cache.get(&params.cache_key())
            {
                debug!("Cache hit for '{}'", params.query);
                state.results = Some(Arc::clone(&hit));
                state.is_loading = false;
                state.record_history(&params, &hit);
                self.persist(state);
                drop(guard);

                self.emit(StoreEvent::ResultsUpdated {
                    total: hit.total_found(),
                    loaded: hit.products.len(),
                    from_cache: true,
                    appended: false,
                });
                return Ok(hit);
            }

            state.is_loading = true;
            params
        };

        info!("Searching '{}' (page {})", params.query, params.page);
        self.emit(StoreEvent::SearchStarted {
            query: params.query.clone(),
            page: params.page,
        });

        let outcome = self.api.search_products(&params).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let is_current = self.search_generation.load(Ordering::SeqCst) == generation;

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                if params.page == 1 {
                    state.cache.insert(params.cache_key(), Arc::clone(&result));
                }
                if !is_current {
                    debug!("Discarding stale response for '{}'", params.query);
                    return Ok(result);
                }

                let (applied, appended) = match (&state.results, params.page) {
                    (Some(existing), page) if page > 1 => {
                        (Arc::new(existing.appended(&result)), true)
                    }
                    _ => (Arc::clone(&result), false),
                };

                state.results = Some(Arc::clone(&applied));
                state.is_loading = false;
                state.record_history(&params, &result);
                self.persist(state);
                drop(guard);

                if params.page == 1 {
                    self.spawn_telemetry(&params, &result);
                }
                self.emit(StoreEvent::ResultsUpdated {
                    total: applied.total_found(),
                    loaded: applied.products.len(),
                    from_cache: false,
                    appended,
                });
                Ok(applied)
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", params.query, e);
                if is_current {
                    state.error = Some(e.clone());
                    state.is_loading = false;
                    drop(guard);
                    self.emit(StoreEvent::SearchFailed {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    /// Fetches and appends the next page.
    ///
    /// Returns `Ok(None)` without touching the network when there is no next
    /// page or a search/load is already in flight.
    pub async fn load_more(&self) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let generation = self.search_generation.load(Ordering::SeqCst);

        let params = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;

            let Some(current) = state.results.as_ref() else {
                return Ok(None);
            };
            if !current.pagination.has_next || state.is_loading || state.is_loading_more {
                debug!("load_more ignored: nothing to load or already loading");
                return Ok(None);
            }

            let params = SearchParams {
                page: current.pagination.page,
                ..state.params.clone()
            }
            .next_page();
            state.is_loading_more = true;
            params
        };

        self.emit(StoreEvent::SearchStarted {
            query: params.query.clone(),
            page: params.page,
        });

        let outcome = self.api.search_products(&params).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.is_loading_more = false;

        if self.search_generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding page {} from a superseded search", params.page);
            return Ok(None);
        }

        match outcome {
            Ok(page) => {
                let merged = match state.results.as_ref() {
                    Some(existing) => Arc::new(existing.appended(&page)),
                    None => Arc::new(page),
                };
                state.results = Some(Arc::clone(&merged));
                state.params.page = params.page;
                state.error = None;
                drop(guard);

                self.emit(StoreEvent::ResultsUpdated {
                    total: merged.total_found(),
                    loaded: merged.products.len(),
                    from_cache: false,
                    appended: true,
                });
                Ok(Some(merged))
            }
            Err(e) => {
                warn!("Loading page {} failed: {}", params.page, e);
                state.error = Some(e.clone());
                drop(guard);
                self.emit(StoreEvent::SearchFailed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Resets query, results, error and pagination. Filters, preferences and
    /// history are kept.
    pub async fn clear_search(&self) {
        self.search_generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().await;
            state.params.query.clear();
            state.params.page = 1;
            state.results = None;
            state.error = None;
            state.is_loading = false;
            state.is_loading_more = false;
        }
        self.emit(StoreEvent::SearchCleared);
    }

    // ----------------------------------------------------------------------
    // Filters, sort and view
    // ----------------------------------------------------------------------

    /// Commits new filters, resets to page 1 and re-searches when a query is
    /// active. Returns the re-search result, if one ran.
    async fn commit_filters(
        &self,
        filters: SearchFilters,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let (active_count, has_query) = {
            let mut state = self.state.write().await;
            state.params.filters = filters;
            state.params.page = 1;
            self.persist(&state);
            (
                state.params.filters.active_count(),
                !state.params.query.is_empty(),
            )
        };
        self.emit(StoreEvent::FiltersChanged { active_count });

        if has_query {
            self.search(SearchRequest::default()).await.map(Some)
        } else {
            Ok(None)
        }
    }

    async fn reject(&self, err: SearchError) -> SearchError {
        self.state.write().await.error = Some(err.clone());
        self.emit(StoreEvent::SearchFailed {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }

    pub async fn set_filters(
        &self,
        update: FilterUpdate,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let current = self.filters().await;
        match current.apply(update) {
            Ok(next) => self.commit_filters(next).await,
            Err(e) => Err(self.reject(e).await),
        }
    }

    pub async fn toggle_filter(
        &self,
        key: &FilterKey,
        value: FilterValue,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let mut next = self.filters().await;
        match next.toggle(key, value) {
            Ok(()) => self.commit_filters(next).await,
            Err(e) => Err(self.reject(e).await),
        }
    }

    pub async fn clear_filter(
        &self,
        key: &FilterKey,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let mut next = self.filters().await;
        next.clear(key);
        self.commit_filters(next).await
    }

    pub async fn clear_filters(&self) -> Result<Option<Arc<SearchResult>>, SearchError> {
        self.commit_filters(SearchFilters::default()).await
    }

    pub async fn set_sort(&self, sort: SortOrder) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let has_query = {
            let mut state = self.state.write().await;
            state.params.sort = sort;
            state.params.page = 1;
            self.persist(&state);
            !state.params.query.is_empty()
        };
        self.emit(StoreEvent::SortChanged {
            sort: sort.to_string(),
        });

        if has_query {
            self.search(SearchRequest::default()).await.map(Some)
        } else {
            Ok(None)
        }
    }

    pub async fn set_view_mode(&self, view_mode: ViewMode) {
        {
            let mut state = self.state.write().await;
            state.view_mode = view_mode;
            self.persist(&state);
        }
        self.emit(StoreEvent::ViewModeChanged);
    }

    pub async fn export_filters(&self) -> Result<String, SearchError> {
        let filters = self.filters().await;
        serde_json::to_string_pretty(&filters)
            .map_err(|e| SearchError::unknown(format!("failed to serialize filters: {e}")))
    }

    /// Replaces the filters with a previously exported document.
    pub async fn import_filters(
        &self,
        json: &str,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let parsed = serde_json::from_str::<SearchFilters>(json)
            .map_err(SearchError::from)
            .and_then(|f| f.validate().map(|()| f));
        match parsed {
            Ok(filters) => self.commit_filters(filters).await,
            Err(e) => Err(self.reject(e).await),
        }
    }

    /// Fetches category, vendor and price-range options concurrently. A failed
    /// list is logged and left empty.
    pub async fn load_filter_options(&self) -> FilterOptions {
        let (categories, vendors, price_ranges) = futures::future::join3(
            self.api.categories(),
            self.api.vendors(),
            self.api.price_ranges(),
        )
        .await;

        let options = FilterOptions {
            categories: categories.unwrap_or_else(|e| {
                warn!("Failed to load categories: {e}");
                Vec::new()
            }),
            vendors: vendors.unwrap_or_else(|e| {
                warn!("Failed to load vendors: {e}");
                Vec::new()
            }),
            price_ranges: price_ranges.unwrap_or_else(|e| {
                warn!("Failed to load price ranges: {e}");
                Vec::new()
            }),
        };

        self.state.write().await.filter_options = options.clone();
        self.emit(StoreEvent::FilterOptionsLoaded);
        options
    }

    // ----------------------------------------------------------------------
    // URL mirror
    // ----------------------------------------------------------------------

    pub async fn url_state(&self) -> UrlState {
        let state = self.state.read().await;
        UrlState {
            query: state.params.query.clone(),
            filters: state.params.filters.clone(),
            sort: state.params.sort,
            page: state.params.page,
        }
    }

    pub async fn url_query(&self) -> String {
        self.url_state().await.to_query_string()
    }

    /// Applies a shared query string and searches if it names a query or filter.
    pub async fn restore_from_url(
        &self,
        query_string: &str,
    ) -> Result<Option<Arc<SearchResult>>, SearchError> {
        let restored = UrlState::from_query_string(query_string);
        if !restored.is_searchable() {
            {
                let mut state = self.state.write().await;
                state.params.sort = restored.sort;
                self.persist(&state);
            }
            self.emit(StoreEvent::SortChanged {
                sort: restored.sort.to_string(),
            });
            return Ok(None);
        }

        let request = SearchRequest::query(restored.query)
            .with_filters(restored.filters)
            .with_sort(restored.sort)
            .with_page(restored.page);
        self.search(request).await.map(Some)
    }

    // ----------------------------------------------------------------------
    // Suggestions
    // ----------------------------------------------------------------------

    async fn set_suggestion_phase(&self, phase: SuggestionPhase) {
        self.state.write().await.suggestion_phase = phase;
    }

    /// Stops any pending suggestion request and clears the list.
    pub async fn cancel_suggestions(&self) {
        self.suggestion_generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().await;
            state.suggestions.clear();
            state.suggestion_query.clear();
            state.suggestion_phase = SuggestionPhase::Idle;
        }
        self.emit(StoreEvent::SuggestionsCleared);
    }

    /// Debounced suggestion fetch for `input`.
    ///
    /// Returns the phase this call left the store in, or `None` when a newer
    /// call superseded it (its response, if any, was discarded).
    pub async fn get_suggestions(&self, input: &str) -> Option<SuggestionPhase> {
        let generation = self.suggestion_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = input.trim().to_string();

        if query.chars().count() < self.suggestion_config.min_query_length {
            {
                let mut state = self.state.write().await;
                state.suggestions.clear();
                state.suggestion_query = query;
                state.suggestion_phase = SuggestionPhase::Idle;
            }
            self.emit(StoreEvent::SuggestionsCleared);
            return Some(SuggestionPhase::Idle);
        }

        {
            let mut state = self.state.write().await;
            state.suggestion_query.clone_from(&query);
            state.suggestion_phase = SuggestionPhase::Debouncing;
        }

        tokio::time::sleep(self.suggestion_config.debounce()).await;
        if self.suggestion_generation.load(Ordering::SeqCst) != generation {
            return None;
        }

        self.set_suggestion_phase(SuggestionPhase::Fetching).await;
        let outcome = self
            .api
            .suggestions(&query, self.suggestion_config.max_suggestions)
            .await;

        let mut state = self.state.write().await;
        if self.suggestion_generation.load(Ordering::SeqCst) != generation
            || state.suggestion_query != query
        {
            debug!("Discarding stale suggestions for '{}'", query);
            return None;
        }

        let phase = match outcome {
            Ok(remote) => {
                let recent: Vec<SearchSuggestion> = state
                    .history
                    .matching_recent(&query, self.suggestion_config.recent_suggestions)
                    .into_iter()
                    .map(|t| SearchSuggestion::query(t.query.clone()))
                    .collect();
                state.suggestions = merge_suggestions(
                    remote,
                    recent,
                    self.suggestion_config.max_suggestions,
                );
                if state.suggestions.is_empty() {
                    SuggestionPhase::Empty
                } else {
                    SuggestionPhase::Populated
                }
            }
            Err(e) => {
                warn!("Suggestions for '{}' unavailable: {}", query, e);
                state.suggestions.clear();
                SuggestionPhase::Error
            }
        };
        state.suggestion_phase = phase;
        let count = state.suggestions.len();
        drop(state);

        self.emit(StoreEvent::SuggestionsUpdated { query, count });
        Some(phase)
    }

    // ----------------------------------------------------------------------
    // History and saved searches
    // ----------------------------------------------------------------------

    fn history_changed(&self, state: &StoreState) {
        self.persist(state);
        self.emit(StoreEvent::HistoryChanged {
            recent: state.history.recent_len(),
            saved: state.history.saved().len(),
        });
    }

    pub async fn clear_history(&self) {
        let mut state = self.state.write().await;
        state.history.clear_recent();
        self.history_changed(&state);
    }

    pub async fn remove_recent(&self, query: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.history.remove_recent(query);
        if removed {
            self.history_changed(&state);
        }
        removed
    }

    /// Saves the current query, filters and sort under `name`.
    pub async fn save_current_search(
        &self,
        name: &str,
        tags: Vec<String>,
    ) -> Result<SavedSearch, SearchError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let saved = state.history.save_search(
            name,
            &state.params.query,
            state.params.filters.clone(),
            state.params.sort,
            tags,
        )?;
        self.history_changed(state);
        Ok(saved)
    }

    pub async fn save_search(
        &self,
        name: &str,
        query: &str,
        filters: SearchFilters,
        sort: SortOrder,
        tags: Vec<String>,
    ) -> Result<SavedSearch, SearchError> {
        let mut state = self.state.write().await;
        let saved = state.history.save_search(name, query, filters, sort, tags)?;
        self.history_changed(&state);
        Ok(saved)
    }

    /// Applies a saved search and runs it.
    pub async fn load_saved_search(
        &self,
        id: SavedSearchId,
    ) -> Result<Arc<SearchResult>, SearchError> {
        let saved = {
            let mut state = self.state.write().await;
            let saved = state.history.touch_saved(id)?;
            self.history_changed(&state);
            saved
        };

        self.search(
            SearchRequest::query(saved.query)
                .with_filters(saved.filters)
                .with_sort(saved.sort),
        )
        .await
    }

    pub async fn update_saved_search(
        &self,
        id: SavedSearchId,
        update: SavedSearchUpdate,
    ) -> Result<SavedSearch, SearchError> {
        let mut state = self.state.write().await;
        let saved = state.history.update_saved(id, update)?;
        self.history_changed(&state);
        Ok(saved)
    }

    pub async fn delete_saved_search(&self, id: SavedSearchId) -> bool {
        let mut state = self.state.write().await;
        let deleted = state.history.delete_saved(id);
        if deleted {
            self.history_changed(&state);
        }
        deleted
    }

    pub async fn export_history(&self) -> Result<String, SearchError> {
        self.state.read().await.history.export_json()
    }

    pub async fn import_history(&self, json: &str) -> Result<ImportSummary, SearchError> {
        let mut state = self.state.write().await;
        let summary = state.history.import_json(json)?;
        self.history_changed(&state);
        Ok(summary)
    }
}

/// Remote suggestions first, then recent searches, deduplicated by text.
fn merge_suggestions(
    remote: Vec<SearchSuggestion>,
    recent: Vec<SearchSuggestion>,
    max: usize,
) -> Vec<SearchSuggestion> {
    let mut seen = std::collections::HashSet::new();
    remote
        .into_iter()
        .chain(recent)
        .filter(|s| seen.insert(s.text.to_lowercase()))
        .take(max)
        .collect()
}
