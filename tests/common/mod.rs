//! Shared fixtures for store-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use marketsearch::clients::search_api::{NoResultsReport, SearchAnalytics, SearchApi};
use marketsearch::config::Config;
use marketsearch::domain::SearchParams;
use marketsearch::error::SearchError;
use marketsearch::models::{
    CategoryOption, Pagination, PriceRangeOption, Product, SearchResult, SearchSuggestion,
    VendorOption,
};
use marketsearch::services::{MemoryStorage, SearchStore, StateStorage};

type SearchFn = dyn Fn(&SearchParams) -> Result<SearchResult, SearchError> + Send + Sync;
type SuggestFn = dyn Fn(&str) -> Result<Vec<SearchSuggestion>, SearchError> + Send + Sync;

/// Records every call and answers from configurable responders. A call can be
/// held open with [`MockSearchApi::hold_search`] / [`MockSearchApi::hold_suggestions`]
/// until the returned `Notify` is signalled.
pub struct MockSearchApi {
    search_fn: Mutex<Box<SearchFn>>,
    suggest_fn: Mutex<Box<SuggestFn>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub search_calls: Mutex<Vec<SearchParams>>,
    pub suggest_calls: Mutex<Vec<String>>,
    pub analytics_calls: AtomicUsize,
    pub no_results_calls: AtomicUsize,
    pub fail_telemetry: bool,
    pub fail_vendors: bool,
    /// How long each analytics post takes to complete.
    pub analytics_delay: Duration,
}

impl MockSearchApi {
    pub fn new() -> Self {
        Self {
            search_fn: Mutex::new(Box::new(|params: &SearchParams| Ok(page_of(params, 2, 2)))
                as Box<SearchFn>),
            suggest_fn: Mutex::new(Box::new(|q: &str| {
                Ok(vec![
                    SearchSuggestion::query(format!("{q} one")),
                    SearchSuggestion::query(format!("{q} two")),
                ])
            }) as Box<SuggestFn>),
            gates: Mutex::new(HashMap::new()),
            search_calls: Mutex::new(Vec::new()),
            suggest_calls: Mutex::new(Vec::new()),
            analytics_calls: AtomicUsize::new(0),
            no_results_calls: AtomicUsize::new(0),
            fail_telemetry: false,
            fail_vendors: false,
            analytics_delay: Duration::ZERO,
        }
    }

    pub fn on_search(
        &self,
        f: impl Fn(&SearchParams) -> Result<SearchResult, SearchError> + Send + Sync + 'static,
    ) {
        *self.search_fn.lock().unwrap() = Box::new(f);
    }

    pub fn on_suggest(
        &self,
        f: impl Fn(&str) -> Result<Vec<SearchSuggestion>, SearchError> + Send + Sync + 'static,
    ) {
        *self.suggest_fn.lock().unwrap() = Box::new(f);
    }

    pub fn hold_search(&self, query: &str, page: u32) -> Arc<Notify> {
        self.gate(format!("search:{query}#{page}"))
    }

    pub fn hold_suggestions(&self, query: &str) -> Arc<Notify> {
        self.gate(format!("suggest:{query}"))
    }

    fn gate(&self, key: String) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(key, Arc::clone(&notify));
        notify
    }

    async fn wait_gate(&self, key: &str) {
        let gate = self.gates.lock().unwrap().remove(key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.lock().unwrap().len()
    }

    pub fn last_search(&self) -> SearchParams {
        self.search_calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no search issued")
    }

    pub fn suggest_queries(&self) -> Vec<String> {
        self.suggest_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchApi for MockSearchApi {
    async fn search_products(&self, params: &SearchParams) -> Result<SearchResult, SearchError> {
        self.search_calls.lock().unwrap().push(params.clone());
        self.wait_gate(&format!("search:{}#{}", params.query, params.page))
            .await;
        let respond = self.search_fn.lock().unwrap();
        (**respond)(params)
    }

    async fn suggestions(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchSuggestion>, SearchError> {
        self.suggest_calls.lock().unwrap().push(query.to_string());
        self.wait_gate(&format!("suggest:{query}")).await;
        let respond = self.suggest_fn.lock().unwrap();
        (**respond)(query)
    }

    async fn categories(&self) -> Result<Vec<CategoryOption>, SearchError> {
        Ok(vec![CategoryOption {
            id: "electronics".into(),
            name: "Electronics".into(),
            product_count: 120,
        }])
    }

    async fn vendors(&self) -> Result<Vec<VendorOption>, SearchError> {
        if self.fail_vendors {
            return Err(SearchError::server(500, "vendors down"));
        }
        Ok(vec![VendorOption {
            id: "v1".into(),
            name: "Vendor One".into(),
            product_count: 10,
        }])
    }

    async fn price_ranges(&self) -> Result<Vec<PriceRangeOption>, SearchError> {
        Ok(vec![PriceRangeOption {
            label: "Under 100".into(),
            min: 0.0,
            max: 100.0,
            count: 4,
        }])
    }

    async fn track_search(&self, _analytics: &SearchAnalytics) -> Result<(), SearchError> {
        if !self.analytics_delay.is_zero() {
            tokio::time::sleep(self.analytics_delay).await;
        }
        self.analytics_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_telemetry {
            return Err(SearchError::network("analytics unreachable"));
        }
        Ok(())
    }

    async fn report_no_results(&self, _report: &NoResultsReport) -> Result<(), SearchError> {
        self.no_results_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_telemetry {
            return Err(SearchError::network("no-results endpoint unreachable"));
        }
        Ok(())
    }
}

pub fn product(id: usize) -> Product {
    Product {
        id: format!("p{id}"),
        name: format!("Product {id}"),
        slug: Some(format!("product-{id}")),
        price: 150_000.0,
        original_price: None,
        currency: "COP".into(),
        image_url: None,
        vendor_id: Some("v1".into()),
        vendor_name: Some("Vendor One".into()),
        category_id: Some("electronics".into()),
        rating: Some(4.2),
        review_count: 3,
        in_stock: true,
        created_at: None,
    }
}

/// A page for `params` holding `count` products out of `total`.
pub fn page_of(params: &SearchParams, count: usize, total: u64) -> SearchResult {
    let offset = (params.page as usize - 1) * params.limit as usize;
    SearchResult {
        products: (offset..offset + count).map(product).collect(),
        pagination: Pagination::new(params.page, params.limit, total, None),
        search_time_ms: 12,
        ..SearchResult::empty(&params.query)
    }
}

pub fn store_with(api: &Arc<MockSearchApi>, config: &Config) -> SearchStore {
    store_with_storage(api, Arc::new(MemoryStorage::new()), config)
}

pub fn store_with_storage(
    api: &Arc<MockSearchApi>,
    storage: Arc<dyn StateStorage>,
    config: &Config,
) -> SearchStore {
    let api: Arc<dyn SearchApi> = Arc::clone(api) as Arc<dyn SearchApi>;
    SearchStore::new(api, storage, config)
}

/// Lets spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
