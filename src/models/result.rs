use serde::{Deserialize, Serialize};

use super::product::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOption {
    pub value: String,
    pub label: String,
    pub count: u64,
    pub selected: bool,
}

/// A filterable dimension returned alongside results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub key: String,
    pub label: String,
    pub options: Vec<FacetOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Builds pagination metadata, deriving the page count when the remote
    /// side did not send one.
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64, total_pages: Option<u32>) -> Self {
        let total_pages = total_pages.unwrap_or_else(|| {
            if limit == 0 {
                0
            } else {
                u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
            }
        });
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 20, 0, Some(0))
    }
}

/// Snapshot produced by one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub products: Vec<Product>,
    pub facets: Vec<Facet>,
    pub pagination: Pagination,
    pub search_time_ms: u64,
    pub query: String,
    pub suggestions: Vec<String>,
    pub did_you_mean: Option<String>,
}

impl SearchResult {
    #[must_use]
    pub fn empty(query: &str) -> Self {
        Self {
            products: Vec::new(),
            facets: Vec::new(),
            pagination: Pagination::default(),
            search_time_ms: 0,
            query: query.to_string(),
            suggestions: Vec::new(),
            did_you_mean: None,
        }
    }

    #[must_use]
    pub const fn total_found(&self) -> u64 {
        self.pagination.total
    }

    /// Extends this snapshot with the next page. Facets and echoed query stay
    /// as they were on the first page.
    #[must_use]
    pub fn appended(&self, next: &Self) -> Self {
        let mut merged = self.clone();
        merged.products.extend(next.products.iter().cloned());
        merged.pagination = next.pagination;
        merged.search_time_ms = next.search_time_ms;
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_derives_flags() {
        let p = Pagination::new(2, 20, 45, None);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(3, 20, 45, Some(3));
        assert!(!last.has_next);
    }

    #[test]
    fn test_pagination_zero_limit() {
        let p = Pagination::new(1, 0, 10, None);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }
}
