//! Mirrors the search session in an address-bar query string so a search can
//! be shared, bookmarked and restored on load.

use url::form_urlencoded;

use crate::clients::encoding::{decode_filters, encode_filters};
use crate::domain::{SearchFilters, SortOrder};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlState {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: SortOrder,
    pub page: u32,
}

impl UrlState {
    /// Renders the state; defaults are omitted so a fresh session yields "".
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        let query = self.query.trim();
        if !query.is_empty() {
            serializer.append_pair("q", query);
        }
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }
        if self.sort != SortOrder::Relevance {
            serializer.append_pair("sort", self.sort.as_str());
        }
        for (key, value) in encode_filters(&self.filters) {
            serializer.append_pair(&key, &value);
        }

        serializer.finish()
    }

    /// Parses a query string, with or without a leading `?`. Unknown keys are
    /// ignored and malformed values fall back to defaults.
    #[must_use]
    pub fn from_query_string(qs: &str) -> Self {
        let qs = qs.strip_prefix('?').unwrap_or(qs);
        let pairs: Vec<(String, String)> = form_urlencoded::parse(qs.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut state = Self {
            page: 1,
            ..Self::default()
        };
        for (key, value) in &pairs {
            match key.as_str() {
                "q" => state.query = value.trim().to_string(),
                "page" => state.page = value.parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1),
                "sort" => state.sort = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        state.filters = decode_filters(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        state
    }

    /// Whether restoring this state should trigger a search.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        !self.query.is_empty() || !self.filters.is_default()
    }
}
