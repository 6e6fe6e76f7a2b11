//! Store behaviour against a recording mock API.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{MockSearchApi, page_of, settle, store_with, store_with_storage};
use marketsearch::clients::HttpSearchApi;
use marketsearch::config::Config;
use marketsearch::domain::events::StoreEvent;
use marketsearch::domain::{
    FilterKey, FilterUpdate, FilterValue, PriceRange, SearchFilters, SearchRequest, SortOrder,
    ViewMode,
};
use marketsearch::error::{ErrorKind, SearchError};
use marketsearch::services::{MemoryStorage, SearchStore, StateStorage};

#[tokio::test]
async fn test_identical_search_is_served_from_cache() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let first = store.search(SearchRequest::query("laptop")).await.unwrap();
    let second = store.search(SearchRequest::query("laptop")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(api.search_count(), 1);
    assert!(!store.is_loading().await);
}

#[tokio::test(start_paused = true)]
async fn test_expired_cache_entry_goes_back_to_network() {
    let api = Arc::new(MockSearchApi::new());
    let config = Config::default();
    let store = store_with(&api, &config);

    store.search(SearchRequest::query("laptop")).await.unwrap();
    tokio::time::advance(config.search.cache_ttl() + Duration::from_secs(1)).await;
    store.search(SearchRequest::query("laptop")).await.unwrap();

    assert_eq!(api.search_count(), 2);
}

#[tokio::test]
async fn test_laptop_search_with_price_range() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| Ok(page_of(params, 2, 57)));
    let store = store_with(&api, &Config::default());

    let filters = SearchFilters {
        price_range: PriceRange::new(100_000.0, 500_000.0).unwrap(),
        ..SearchFilters::default()
    };
    store
        .search(
            SearchRequest::query("laptop")
                .with_filters(filters)
                .with_sort(SortOrder::PriceAsc),
        )
        .await
        .unwrap();

    let snapshot = store.snapshot().await;
    let results = snapshot.results.as_ref().unwrap();
    assert_eq!(results.products.len(), 2);
    assert_eq!(snapshot.total_products(), 57);
    assert!(snapshot.can_load_more());
    assert_eq!(snapshot.active_filters_count(), 1);

    let sent = api.last_search();
    assert_eq!(sent.sort, SortOrder::PriceAsc);
    assert_eq!(sent.page, 1);
    assert!((sent.filters.price_range.min() - 100_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_no_match_reports_without_surfacing_errors() {
    let mut mock = MockSearchApi::new();
    mock.fail_telemetry = true;
    let api = Arc::new(mock);
    api.on_search(|params| Ok(page_of(params, 0, 0)));
    let store = store_with(&api, &Config::default());

    let result = store
        .search(SearchRequest::query("zzz_no_match"))
        .await
        .unwrap();
    settle().await;

    assert!(result.products.is_empty());
    assert_eq!(result.total_found(), 0);
    assert_eq!(api.no_results_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.analytics_calls.load(Ordering::SeqCst), 1);
    assert!(store.error().await.is_none());
}

#[tokio::test]
async fn test_load_more_while_loading_is_dropped() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| Ok(page_of(params, 20, 45)));
    let store = Arc::new(store_with(&api, &Config::default()));

    store.search(SearchRequest::query("laptop")).await.unwrap();
    assert!(store.can_load_more().await);

    let gate = api.hold_search("laptop", 2);
    let background = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.load_more().await }
    });
    settle().await;

    assert_eq!(api.search_count(), 2);
    assert!(store.snapshot().await.is_loading_more);
    assert!(store.load_more().await.unwrap().is_none());
    assert_eq!(api.search_count(), 2);
    assert_eq!(store.results().await.unwrap().products.len(), 20);

    gate.notify_one();
    let merged = background.await.unwrap().unwrap().unwrap();
    assert_eq!(merged.products.len(), 40);
    assert_eq!(merged.pagination.page, 2);
    assert!(merged.pagination.has_next);
    assert!(!store.snapshot().await.is_loading_more);
}

#[tokio::test]
async fn test_load_more_without_next_page_is_noop() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    assert!(store.load_more().await.unwrap().is_none());
    store.search(SearchRequest::query("laptop")).await.unwrap();
    assert!(store.load_more().await.unwrap().is_none());
    assert_eq!(api.search_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_results() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| {
        if params.query == "phone" {
            Err(SearchError::server(503, "unavailable"))
        } else {
            Ok(page_of(params, 2, 2))
        }
    });
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();
    let err = store.search(SearchRequest::query("phone")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.error.as_ref().map(SearchError::kind), Some(ErrorKind::Server));
    assert_eq!(snapshot.results.unwrap().query, "laptop");
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_failed_load_more_keeps_loaded_pages() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| {
        if params.page == 2 {
            Err(SearchError::network("timed out"))
        } else {
            Ok(page_of(params, 20, 45))
        }
    });
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();
    assert!(store.load_more().await.is_err());

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.results.unwrap().products.len(), 20);
    assert_eq!(snapshot.error.map(|e| e.kind()), Some(ErrorKind::Network));
    assert!(!snapshot.is_loading_more);
}

#[tokio::test]
async fn test_invalid_query_never_reaches_network() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let err = store
        .search(SearchRequest::query("<script>"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(api.search_count(), 0);
    assert!(store.error().await.is_some());
    assert!(!store.is_loading().await);
}

#[tokio::test]
async fn test_superseded_search_response_is_not_applied() {
    let api = Arc::new(MockSearchApi::new());
    let store = Arc::new(store_with(&api, &Config::default()));

    let gate = api.hold_search("slow", 1);
    let slow = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.search(SearchRequest::query("slow")).await }
    });
    settle().await;

    store.search(SearchRequest::query("fast")).await.unwrap();
    gate.notify_one();
    slow.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.query, "fast");
    assert_eq!(snapshot.results.unwrap().query, "fast");
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn test_in_stock_filter_active_until_cleared() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store
        .set_filters(FilterUpdate {
            in_stock: Some(true),
            ..FilterUpdate::default()
        })
        .await
        .unwrap();
    assert!(store.is_filter_active(&FilterKey::InStock).await);

    store.clear_filter(&FilterKey::InStock).await.unwrap();
    assert!(!store.is_filter_active(&FilterKey::InStock).await);
    // No query yet, so nothing was searched.
    assert_eq!(api.search_count(), 0);
}

#[tokio::test]
async fn test_toggle_category_twice_restores_filters() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());
    let before = store.filters().await;

    let key: FilterKey = "categories".parse().unwrap();
    store
        .toggle_filter(&key, FilterValue::Text("X".into()))
        .await
        .unwrap();
    assert!(store.filters().await.categories.contains("X"));

    store
        .toggle_filter(&key, FilterValue::Text("X".into()))
        .await
        .unwrap();
    assert_eq!(store.filters().await, before);
}

#[tokio::test]
async fn test_clear_filters_yields_defaults() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store
        .set_filters(FilterUpdate {
            categories: Some(["a".to_string()].into()),
            min_rating: Some(4.0),
            price_range: Some(PriceRange::new(10.0, 20.0).unwrap()),
            ..FilterUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(store.active_filters_count().await, 3);

    store.clear_filters().await.unwrap();
    assert_eq!(store.filters().await, SearchFilters::default());
    assert_eq!(store.active_filters_count().await, 0);
}

#[tokio::test]
async fn test_invalid_filter_update_leaves_filters_unchanged() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let err = store
        .set_filters(FilterUpdate {
            in_stock: Some(true),
            min_rating: Some(9.0),
            ..FilterUpdate::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.filters().await, SearchFilters::default());
    assert!(store.error().await.is_some());
}

#[tokio::test]
async fn test_filter_change_re_searches_from_first_page() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| Ok(page_of(params, 20, 45)));
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();
    store.load_more().await.unwrap();

    let result = store
        .set_filters(FilterUpdate {
            in_stock: Some(true),
            ..FilterUpdate::default()
        })
        .await
        .unwrap()
        .expect("active query triggers a search");

    let sent = api.last_search();
    assert_eq!(sent.page, 1);
    assert_eq!(sent.query, "laptop");
    assert!(sent.filters.in_stock);
    assert_eq!(result.products.len(), 20);
}

#[tokio::test]
async fn test_sort_change_re_searches() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();
    store.set_sort(SortOrder::Newest).await.unwrap();

    assert_eq!(api.search_count(), 2);
    assert_eq!(api.last_search().sort, SortOrder::Newest);
}

#[tokio::test]
async fn test_filters_export_import_round_trip() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store
        .set_filters(FilterUpdate {
            vendor_ids: Some(["v1".to_string(), "v2".to_string()].into()),
            price_range: Some(PriceRange::new(0.0, 250.0).unwrap()),
            ..FilterUpdate::default()
        })
        .await
        .unwrap();
    let exported_from = store.filters().await;
    let json = store.export_filters().await.unwrap();

    store.clear_filters().await.unwrap();
    store.import_filters(&json).await.unwrap();

    assert_eq!(store.filters().await, exported_from);
}

#[tokio::test]
async fn test_import_filters_rejects_invalid_document() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let err = store
        .import_filters(r#"{"priceRange": {"min": 900, "max": 100}}"#)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.filters().await, SearchFilters::default());
}

#[tokio::test]
async fn test_clear_search_keeps_filters() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store
        .search(SearchRequest::query("laptop").with_filters(SearchFilters {
            in_stock: true,
            ..SearchFilters::default()
        }))
        .await
        .unwrap();
    store.clear_search().await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.query.is_empty());
    assert!(snapshot.results.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.page, 1);
    assert!(snapshot.filters.in_stock);
}

#[tokio::test]
async fn test_recent_history_is_capped_and_deduplicated() {
    let api = Arc::new(MockSearchApi::new());
    let mut config = Config::default();
    config.history.max_recent = 3;
    let store = store_with(&api, &config);

    for query in ["one", "two", "three", "four", "two"] {
        store.search(SearchRequest::query(query)).await.unwrap();
    }

    let recent: Vec<String> = store
        .recent_searches()
        .await
        .into_iter()
        .map(|t| t.query)
        .collect();
    assert_eq!(recent, vec!["two", "four", "three"]);
}

#[tokio::test]
async fn test_preferences_and_history_survive_restart() {
    let api = Arc::new(MockSearchApi::new());
    let config = Config::default();
    let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());

    {
        let store = store_with_storage(&api, Arc::clone(&storage), &config);
        store.search(SearchRequest::query("laptop")).await.unwrap();
        store.set_sort(SortOrder::Rating).await.unwrap();
        store.set_view_mode(ViewMode::List).await;
        store
            .set_filters(FilterUpdate {
                in_stock: Some(true),
                ..FilterUpdate::default()
            })
            .await
            .unwrap();
        store
            .save_current_search("Cheap laptops", vec!["tech".into()])
            .await
            .unwrap();
    }

    let restored = store_with_storage(&api, storage, &config);
    let snapshot = restored.snapshot().await;
    assert_eq!(snapshot.sort, SortOrder::Rating);
    assert_eq!(snapshot.view_mode, ViewMode::List);
    assert!(snapshot.filters.in_stock);
    assert!(snapshot.results.is_none());
    assert!(snapshot.query.is_empty());
    assert_eq!(restored.recent_searches().await[0].query, "laptop");
    assert_eq!(restored.saved_searches_by_tag("tech").await.len(), 1);
}

#[tokio::test]
async fn test_corrupt_persisted_state_falls_back_to_defaults() {
    let api = Arc::new(MockSearchApi::new());
    let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::with_contents("{not json"));
    let store = store_with_storage(&api, storage, &Config::default());

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.filters, SearchFilters::default());
    assert_eq!(snapshot.sort, SortOrder::Relevance);
    assert!(store.recent_searches().await.is_empty());
}

#[tokio::test]
async fn test_restore_from_url_runs_search() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let result = store
        .restore_from_url("?q=laptop&categories=a,b&sort=rating&inStock=true")
        .await
        .unwrap();

    assert!(result.is_some());
    let sent = api.last_search();
    assert_eq!(sent.query, "laptop");
    assert_eq!(sent.sort, SortOrder::Rating);
    assert!(sent.filters.in_stock);
    assert_eq!(sent.filters.categories.len(), 2);

    let shared = store.url_query().await;
    assert!(shared.contains("q=laptop"));
    assert!(shared.contains("sort=rating"));
}

#[tokio::test]
async fn test_restore_from_empty_url_does_not_search() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    assert!(store.restore_from_url("").await.unwrap().is_none());
    assert_eq!(api.search_count(), 0);
}

#[tokio::test]
async fn test_restore_sort_only_url_persists_and_notifies() {
    let api = Arc::new(MockSearchApi::new());
    let config = Config::default();
    let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
    let store = store_with_storage(&api, Arc::clone(&storage), &config);
    let mut events = store.subscribe();

    assert!(store.restore_from_url("?sort=price_asc").await.unwrap().is_none());

    assert_eq!(api.search_count(), 0);
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::SortChanged {
            sort: SortOrder::PriceAsc.to_string()
        }
    );
    assert!(storage.load().unwrap().is_some());

    let restarted = store_with_storage(&api, storage, &config);
    assert_eq!(restarted.snapshot().await.sort, SortOrder::PriceAsc);
}

#[tokio::test]
async fn test_saved_search_runs_with_its_parameters() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    let saved = store
        .save_search(
            "Gaming",
            "gaming laptop",
            SearchFilters {
                min_rating: 4.0,
                ..SearchFilters::default()
            },
            SortOrder::PriceDesc,
            vec![],
        )
        .await
        .unwrap();

    store.load_saved_search(saved.id).await.unwrap();

    let sent = api.last_search();
    assert_eq!(sent.query, "gaming laptop");
    assert_eq!(sent.sort, SortOrder::PriceDesc);
    assert!((sent.filters.min_rating - 4.0).abs() < f32::EPSILON);
    assert!(store.saved_searches().await[0].last_used_at.is_some());

    assert!(store.delete_saved_search(saved.id).await);
    assert!(store.load_saved_search(saved.id).await.is_err());
}

#[tokio::test]
async fn test_history_import_rejects_bad_document_untouched() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());
    store.search(SearchRequest::query("laptop")).await.unwrap();
    let exported = store.export_history().await.unwrap();

    assert!(store.import_history(r#"{"version": 1, "recent": "nope"}"#).await.is_err());
    assert_eq!(store.recent_searches().await.len(), 1);

    store.clear_history().await;
    let summary = store.import_history(&exported).await.unwrap();
    assert_eq!(summary.recent_merged, 1);
    assert_eq!(store.recent_searches().await[0].query, "laptop");
}

#[tokio::test]
async fn test_filter_options_tolerate_partial_failure() {
    let mut mock = MockSearchApi::new();
    mock.fail_vendors = true;
    let api = Arc::new(mock);
    let store = store_with(&api, &Config::default());

    let options = store.load_filter_options().await;
    assert_eq!(options.categories.len(), 1);
    assert!(options.vendors.is_empty());
    assert_eq!(options.price_ranges.len(), 1);
    assert_eq!(store.snapshot().await.filter_options, options);
}

#[tokio::test]
async fn test_subscribers_see_search_lifecycle() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());
    let mut events = store.subscribe();

    store.search(SearchRequest::query("laptop")).await.unwrap();
    store.search(SearchRequest::query("laptop")).await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::SearchStarted {
            query: "laptop".into(),
            page: 1
        }
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        StoreEvent::ResultsUpdated {
            from_cache: false,
            ..
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        StoreEvent::ResultsUpdated {
            from_cache: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_all_tags_lists_each_tag_once() {
    let api = Arc::new(MockSearchApi::new());
    let store = store_with(&api, &Config::default());

    store
        .save_search(
            "Desks",
            "desk",
            SearchFilters::default(),
            SortOrder::Relevance,
            vec!["office".into(), "home".into()],
        )
        .await
        .unwrap();
    store
        .save_search(
            "Chairs",
            "chair",
            SearchFilters::default(),
            SortOrder::Relevance,
            vec!["office".into()],
        )
        .await
        .unwrap();

    assert_eq!(store.all_tags().await, vec!["home", "office"]);
}

#[tokio::test]
async fn test_zero_max_limit_does_not_panic() {
    let api = Arc::new(MockSearchApi::new());
    let mut config = Config::default();
    config.search.max_limit = 0;
    let store = store_with(&api, &config);

    store
        .search(SearchRequest::query("laptop").with_limit(50))
        .await
        .unwrap();

    assert_eq!(api.last_search().limit, 1);
}

#[tokio::test]
async fn test_load_more_keeps_request_timeout() {
    let api = Arc::new(MockSearchApi::new());
    api.on_search(|params| Ok(page_of(params, 20, 57)));
    let store = store_with(&api, &Config::default());
    let timeout = Duration::from_millis(750);

    store
        .search(SearchRequest::query("laptop").with_timeout(timeout))
        .await
        .unwrap();
    store.load_more().await.unwrap().unwrap();

    let sent = api.last_search();
    assert_eq!(sent.page, 2);
    assert_eq!(sent.timeout, Some(timeout));
}

#[tokio::test]
async fn test_stalled_server_times_out_into_error_slot() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let api =
        HttpSearchApi::with_shared_client(reqwest::Client::new(), &format!("http://{addr}")).unwrap();
    let store = SearchStore::new(
        Arc::new(api),
        Arc::new(MemoryStorage::new()),
        &Config::default(),
    );

    let err = store
        .search(SearchRequest::query("laptop").with_timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(store.error().await.map(|e| e.kind()), Some(ErrorKind::Network));
    assert!(!store.is_loading().await);
}

#[tokio::test(start_paused = true)]
async fn test_flush_telemetry_waits_for_analytics() {
    let mut mock = MockSearchApi::new();
    mock.analytics_delay = Duration::from_millis(300);
    let api = Arc::new(mock);
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();
    assert_eq!(api.analytics_calls.load(Ordering::SeqCst), 0);

    assert_eq!(store.flush_telemetry(Duration::from_secs(2)).await, 0);
    assert_eq!(api.analytics_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_flush_telemetry_gives_up_after_limit() {
    let mut mock = MockSearchApi::new();
    mock.analytics_delay = Duration::from_secs(30);
    let api = Arc::new(mock);
    let store = store_with(&api, &Config::default());

    store.search(SearchRequest::query("laptop")).await.unwrap();

    assert_eq!(store.flush_telemetry(Duration::from_millis(100)).await, 1);
    assert_eq!(api.analytics_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.flush_telemetry(Duration::from_millis(100)).await, 0);
}
