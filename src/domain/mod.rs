//! Domain types for the search session with strong typing.
//!
//! Filters, sort order and identifiers live here so that the adapter, the store
//! and the persistence layer agree on one shape.

pub mod events;
pub mod filters;
pub mod params;

pub use filters::{DateRange, FilterKey, FilterUpdate, FilterValue, PriceRange, SearchFilters};
pub use params::{SearchParams, SearchRequest};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound of the default price range. Ranges that reach it are treated
/// as "no maximum" and are not sent to the remote API.
pub const DEFAULT_MAX_PRICE: f64 = 10_000_000.0;

/// Highest rating a product can carry.
pub const MAX_RATING: f32 = 5.0;

/// Unique identifier for a saved search.
///
/// # Examples
///
/// ```rust
/// use marketsearch::domain::SavedSearchId;
///
/// let id = SavedSearchId::new();
/// let parsed: SavedSearchId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedSearchId(Uuid);

impl SavedSearchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for SavedSearchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SavedSearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SavedSearchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Result ordering requested from the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
    Popular,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
            Self::Newest => "newest",
            Self::Popular => "popular",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            "popular" => Ok(Self::Popular),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// How the result list is laid out. Persisted as a user preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}
