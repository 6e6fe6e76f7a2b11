//! Translation between store-shaped parameters and flat query pairs.
//!
//! Filters at their default values are omitted so that requests and shared
//! URLs stay minimal. The same pair format is used for the remote API and for
//! the address-bar mirror.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::domain::{DateRange, PriceRange, SearchFilters, SearchParams, SortOrder};

const LIST_DELIMITER: char = ',';
const CUSTOM_PREFIX: &str = "filter_";

pub type QueryPairs = Vec<(String, String)>;

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&LIST_DELIMITER.to_string())
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn encode_custom(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(encode_custom)
            .collect::<Vec<_>>()
            .join(&LIST_DELIMITER.to_string()),
        other => other.to_string(),
    }
}

fn decode_custom(raw: &str) -> Value {
    if raw.contains(LIST_DELIMITER) {
        return Value::Array(
            raw.split(LIST_DELIMITER)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        );
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Encodes the non-default filters as query pairs.
#[must_use]
pub fn encode_filters(filters: &SearchFilters) -> QueryPairs {
    let mut pairs = Vec::new();

    if !filters.categories.is_empty() {
        pairs.push(("categories".to_string(), join_set(&filters.categories)));
    }
    if !filters.vendor_ids.is_empty() {
        pairs.push(("vendors".to_string(), join_set(&filters.vendor_ids)));
    }
    if let Some(min) = filters.price_range.effective_min() {
        pairs.push(("minPrice".to_string(), format_number(min)));
    }
    if let Some(max) = filters.price_range.effective_max() {
        pairs.push(("maxPrice".to_string(), format_number(max)));
    }
    if filters.in_stock {
        pairs.push(("inStock".to_string(), "true".to_string()));
    }
    if filters.min_rating > 0.0 {
        pairs.push((
            "minRating".to_string(),
            format_number(f64::from(filters.min_rating)),
        ));
    }
    if let Some(range) = filters.date_range {
        if let Some(from) = range.from() {
            pairs.push(("dateFrom".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = range.to() {
            pairs.push(("dateTo".to_string(), to.format("%Y-%m-%d").to_string()));
        }
    }
    for (key, value) in &filters.custom {
        pairs.push((format!("{CUSTOM_PREFIX}{key}"), encode_custom(value)));
    }

    pairs
}

/// Encodes a full request for `GET /search/products`.
#[must_use]
pub fn encode_search_params(params: &SearchParams) -> QueryPairs {
    let mut pairs = Vec::new();

    let query = params.query.trim();
    if !query.is_empty() {
        pairs.push(("q".to_string(), query.to_string()));
    }
    pairs.push(("page".to_string(), params.page.to_string()));
    pairs.push(("limit".to_string(), params.limit.to_string()));
    if params.sort != SortOrder::Relevance {
        pairs.push(("sort".to_string(), params.sort.as_str().to_string()));
    }
    pairs.extend(encode_filters(&params.filters));

    pairs
}

/// Rebuilds filters from query pairs. Unknown keys other than `filter_*`
/// entries are ignored, and values that do not parse or violate an invariant
/// are dropped rather than failing the whole decode.
#[must_use]
pub fn decode_filters<'a, I>(pairs: I) -> SearchFilters
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut filters = SearchFilters::default();
    let mut min_price = None;
    let mut max_price = None;
    let mut date_from = None;
    let mut date_to = None;

    for (key, value) in pairs {
        match key {
            "categories" => filters.categories = split_list(value),
            "vendors" => filters.vendor_ids = split_list(value),
            "minPrice" => min_price = value.parse::<f64>().ok(),
            "maxPrice" => max_price = value.parse::<f64>().ok(),
            "inStock" => filters.in_stock = value == "true" || value == "1",
            "minRating" => {
                if let Ok(r) = value.parse::<f32>()
                    && (0.0..=crate::domain::MAX_RATING).contains(&r)
                {
                    filters.min_rating = r;
                }
            }
            "dateFrom" => date_from = value.parse::<NaiveDate>().ok(),
            "dateTo" => date_to = value.parse::<NaiveDate>().ok(),
            other => {
                if let Some(name) = other.strip_prefix(CUSTOM_PREFIX)
                    && !name.is_empty()
                    && !value.is_empty()
                {
                    filters.custom.insert(name.to_string(), decode_custom(value));
                }
            }
        }
    }

    if min_price.is_some() || max_price.is_some() {
        let defaults = PriceRange::default();
        if let Ok(range) = PriceRange::new(
            min_price.unwrap_or(defaults.min()),
            max_price.unwrap_or(defaults.max()),
        ) {
            filters.price_range = range;
        }
    }
    if date_from.is_some() || date_to.is_some() {
        filters.date_range = DateRange::new(date_from, date_to).ok();
    }

    filters
}
