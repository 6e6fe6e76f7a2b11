//! Transport boundary for the remote search API.
//!
//! [`SearchApi`] is the seam the store talks to; [`HttpSearchApi`] is the
//! reqwest implementation. Wire types stay private to this module and are
//! mapped into the crate's models before anything leaves it. Every transport
//! failure is turned into a [`SearchError`] here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::encoding::encode_search_params;
use crate::config::ApiConfig;
use crate::domain::{SearchFilters, SearchParams};
use crate::error::SearchError;
use crate::models::{
    CategoryOption, Facet, FacetOption, Pagination, PriceRangeOption, Product, SearchResult,
    SearchSuggestion, SuggestionMetadata, SuggestionType, VendorOption,
};

/// Body of `POST /search/analytics`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchAnalytics {
    pub query: String,
    pub filters: SearchFilters,
    pub result_count: u64,
    pub search_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /search/no-results`.
#[derive(Debug, Clone, Serialize)]
pub struct NoResultsReport {
    pub query: String,
    pub filters: SearchFilters,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search_products(&self, params: &SearchParams) -> Result<SearchResult, SearchError>;

    async fn suggestions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchSuggestion>, SearchError>;

    async fn categories(&self) -> Result<Vec<CategoryOption>, SearchError>;

    async fn vendors(&self) -> Result<Vec<VendorOption>, SearchError>;

    async fn price_ranges(&self) -> Result<Vec<PriceRangeOption>, SearchError>;

    async fn track_search(&self, event: &SearchAnalytics) -> Result<(), SearchError>;

    async fn report_no_results(&self, report: &NoResultsReport) -> Result<(), SearchError>;
}

/// Unwraps a `{ "data": ... }` envelope when present, otherwise decodes the
/// body as the bare payload. A malformed `data` payload is an error; there is
/// no retry against the outer object.
fn decode_payload<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, SearchError> {
    let malformed = |e: serde_json::Error| SearchError::unknown(format!("malformed {what}: {e}"));

    let payload = match serde_json::from_str::<Value>(body).map_err(malformed)? {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(payload).map_err(malformed)
}

#[derive(Deserialize)]
struct WireSearchResponse {
    products: Vec<WireProduct>,
    #[serde(default)]
    facets: Option<Vec<WireFacet>>,
    pagination: WirePagination,
    #[serde(default)]
    search_time_ms: Option<u64>,
    query: Option<String>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
    did_you_mean: Option<String>,
}

#[derive(Deserialize)]
struct WirePagination {
    page: Option<u32>,
    limit: Option<u32>,
    total: u64,
    total_pages: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WireProduct {
    id: WireId,
    name: String,
    slug: Option<String>,
    price: f64,
    original_price: Option<f64>,
    currency: Option<String>,
    image_url: Option<String>,
    vendor_id: Option<WireId>,
    vendor_name: Option<String>,
    category_id: Option<WireId>,
    rating: Option<f32>,
    #[serde(default)]
    review_count: u32,
    #[serde(default = "default_true")]
    in_stock: bool,
    created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct WireFacet {
    key: String,
    label: Option<String>,
    #[serde(default)]
    options: Vec<WireFacetOption>,
}

#[derive(Deserialize)]
struct WireFacetOption {
    value: String,
    label: Option<String>,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    selected: bool,
}

#[derive(Deserialize)]
struct WireSuggestions {
    suggestions: Vec<WireSuggestion>,
}

#[derive(Deserialize)]
struct WireSuggestion {
    text: String,
    #[serde(rename = "type", default = "default_suggestion_type")]
    kind: SuggestionType,
    count: Option<u64>,
    highlight: Option<String>,
    id: Option<WireId>,
    slug: Option<String>,
}

const fn default_suggestion_type() -> SuggestionType {
    SuggestionType::Query
}

#[derive(Deserialize)]
struct WireNamedOption {
    id: WireId,
    name: String,
    #[serde(default)]
    product_count: u64,
}

#[derive(Deserialize)]
struct WireCategories {
    categories: Vec<WireNamedOption>,
}

#[derive(Deserialize)]
struct WireVendors {
    vendors: Vec<WireNamedOption>,
}

#[derive(Deserialize)]
struct WirePriceRanges {
    price_ranges: Vec<PriceRangeOption>,
}

fn map_product(p: WireProduct) -> Product {
    Product {
        id: p.id.into(),
        name: p.name,
        slug: p.slug,
        price: p.price,
        original_price: p.original_price,
        currency: p.currency.unwrap_or_else(|| "USD".to_string()),
        image_url: p.image_url,
        vendor_id: p.vendor_id.map(Into::into),
        vendor_name: p.vendor_name,
        category_id: p.category_id.map(Into::into),
        rating: p.rating,
        review_count: p.review_count,
        in_stock: p.in_stock,
        created_at: p.created_at,
    }
}

fn map_facet(f: WireFacet) -> Facet {
    Facet {
        label: f.label.unwrap_or_else(|| f.key.clone()),
        key: f.key,
        options: f
            .options
            .into_iter()
            .map(|o| FacetOption {
                label: o.label.unwrap_or_else(|| o.value.clone()),
                value: o.value,
                count: o.count,
                selected: o.selected,
            })
            .collect(),
    }
}

fn map_suggestion(s: WireSuggestion) -> SearchSuggestion {
    SearchSuggestion {
        text: s.text,
        kind: s.kind,
        count: s.count,
        highlight: s.highlight,
        metadata: s.id.map(|id| SuggestionMetadata {
            id: id.into(),
            slug: s.slug,
        }),
    }
}

fn map_search_response(wire: WireSearchResponse, params: &SearchParams) -> SearchResult {
    let products: Vec<Product> = wire.products.into_iter().map(map_product).collect();

    let pagination = Pagination::new(
        wire.pagination.page.unwrap_or(params.page),
        wire.pagination.limit.unwrap_or(params.limit),
        wire.pagination.total,
        wire.pagination.total_pages,
    );

    SearchResult {
        products,
        facets: wire
            .facets
            .unwrap_or_default()
            .into_iter()
            .map(map_facet)
            .collect(),
        pagination,
        search_time_ms: wire.search_time_ms.unwrap_or_default(),
        query: wire.query.unwrap_or_else(|| params.query.trim().to_string()),
        suggestions: wire.suggestions.unwrap_or_default(),
        did_you_mean: wire.did_you_mean,
    }
}

/// Decodes a search response body. Exposed for callers that receive the JSON
/// through another channel (fixtures, server-rendered payloads).
pub fn decode_search_response(body: &str, params: &SearchParams) -> Result<SearchResult, SearchError> {
    let wire: WireSearchResponse = decode_payload(body, "search response")?;
    Ok(map_search_response(wire, params))
}

#[derive(Clone)]
pub struct HttpSearchApi {
    client: Client,
    base_url: String,
}

impl HttpSearchApi {
    /// Builds a client from the API section of the configuration.
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Self::with_shared_client(client, &config.base_url)
    }

    /// Uses an existing HTTP client so connection pools can be shared.
    pub fn with_shared_client(client: Client, base_url: &str) -> anyhow::Result<Self> {
        Url::parse(base_url).map_err(|e| anyhow::anyhow!("Invalid API base URL {base_url}: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SearchError> {
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    async fn send(request: RequestBuilder, path: &str) -> Result<String, SearchError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.chars().take(512).collect()
            };
            return Err(SearchError::server(status.as_u16(), message));
        }

        debug!("{} -> {}", path, status);
        Ok(response.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        pairs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<T, SearchError> {
        let mut url = self.endpoint(path)?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let body = Self::send(request, path).await?;
        decode_payload(&body, &format!("response from {path}"))
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), SearchError> {
        let url = self.endpoint(path)?;
        Self::send(self.client.post(url).json(body), path).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search_products(&self, params: &SearchParams) -> Result<SearchResult, SearchError> {
        let pairs = encode_search_params(params);
        let wire: WireSearchResponse = self
            .get_json("search/products", &pairs, params.timeout)
            .await?;
        Ok(map_search_response(wire, params))
    }

    async fn suggestions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchSuggestion>, SearchError> {
        let pairs = vec![
            ("q".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let wire: WireSuggestions = self.get_json("search/suggestions", &pairs, None).await?;
        Ok(wire.suggestions.into_iter().map(map_suggestion).collect())
    }

    async fn categories(&self) -> Result<Vec<CategoryOption>, SearchError> {
        let wire: WireCategories = self.get_json("search/categories", &[], None).await?;
        Ok(wire
            .categories
            .into_iter()
            .map(|c| CategoryOption {
                id: c.id.into(),
                name: c.name,
                product_count: c.product_count,
            })
            .collect())
    }

    async fn vendors(&self) -> Result<Vec<VendorOption>, SearchError> {
        let wire: WireVendors = self.get_json("search/vendors", &[], None).await?;
        Ok(wire
            .vendors
            .into_iter()
            .map(|v| VendorOption {
                id: v.id.into(),
                name: v.name,
                product_count: v.product_count,
            })
            .collect())
    }

    async fn price_ranges(&self) -> Result<Vec<PriceRangeOption>, SearchError> {
        let wire: WirePriceRanges = self.get_json("search/price-ranges", &[], None).await?;
        Ok(wire.price_ranges)
    }

    async fn track_search(&self, event: &SearchAnalytics) -> Result<(), SearchError> {
        self.post_json("search/analytics", event).await
    }

    async fn report_no_results(&self, report: &NoResultsReport) -> Result<(), SearchError> {
        self.post_json("search/no-results", report).await
    }
}
