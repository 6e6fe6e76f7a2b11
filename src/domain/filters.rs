//! Search filters and the rules for mutating them.
//!
//! `SearchFilters` is only ever changed through [`SearchFilters::apply`],
//! [`SearchFilters::toggle`] and [`SearchFilters::clear`]; the store never
//! pokes at individual fields on behalf of callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{DEFAULT_MAX_PRICE, MAX_RATING};
use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceRange")]
pub struct PriceRange {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawPriceRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawPriceRange> for PriceRange {
    type Error = SearchError;

    fn try_from(raw: RawPriceRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, SearchError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SearchError::validation("price bounds must be finite"));
        }
        if min < 0.0 {
            return Err(SearchError::validation(format!(
                "minimum price cannot be negative (got {min})"
            )));
        }
        if min > max {
            return Err(SearchError::validation(format!(
                "minimum price {min} exceeds maximum price {max}"
            )));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Lower bound when it differs from the default, i.e. when it must be sent.
    #[must_use]
    pub fn effective_min(&self) -> Option<f64> {
        (self.min > 0.0).then_some(self.min)
    }

    #[must_use]
    pub fn effective_max(&self) -> Option<f64> {
        (self.max < DEFAULT_MAX_PRICE).then_some(self.max)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.effective_min().is_none() && self.effective_max().is_none()
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

/// Inclusive date window. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RawDateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = SearchError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.from, raw.to)
    }
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, SearchError> {
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(SearchError::validation(format!(
                "date range starts ({f}) after it ends ({t})"
            )));
        }
        if from.is_none() && to.is_none() {
            return Err(SearchError::validation(
                "date range needs at least one bound",
            ));
        }
        Ok(Self { from, to })
    }

    #[must_use]
    pub const fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    #[must_use]
    pub const fn to(&self) -> Option<NaiveDate> {
        self.to
    }
}

/// Names a single filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Categories,
    PriceRange,
    VendorIds,
    InStock,
    MinRating,
    DateRange,
    Custom(String),
}

impl FilterKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Categories => "categories",
            Self::PriceRange => "priceRange",
            Self::VendorIds => "vendorIds",
            Self::InStock => "inStock",
            Self::MinRating => "minRating",
            Self::DateRange => "dateRange",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "categories" => Self::Categories,
            "priceRange" => Self::PriceRange,
            "vendorIds" => Self::VendorIds,
            "inStock" => Self::InStock,
            "minRating" => Self::MinRating,
            "dateRange" => Self::DateRange,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// Value handed to [`SearchFilters::toggle`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
    Number(f64),
    Price(PriceRange),
    Dates(DateRange),
    Json(Value),
}

impl FilterValue {
    fn into_json(self) -> Value {
        match self {
            Self::Text(s) => Value::String(s),
            Self::Flag(b) => Value::Bool(b),
            Self::Number(n) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
            Self::Price(p) => serde_json::json!({ "min": p.min, "max": p.max }),
            Self::Dates(d) => serde_json::json!({ "from": d.from, "to": d.to }),
            Self::Json(v) => v,
        }
    }
}

/// Partial filter update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    pub categories: Option<BTreeSet<String>>,
    pub price_range: Option<PriceRange>,
    pub vendor_ids: Option<BTreeSet<String>>,
    pub in_stock: Option<bool>,
    pub min_rating: Option<f32>,
    /// `Some(None)` clears the date range.
    pub date_range: Option<Option<DateRange>>,
    /// Entries are merged into the custom map; a `Value::Null` removes the key.
    pub custom: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub categories: BTreeSet<String>,
    pub price_range: PriceRange,
    pub vendor_ids: BTreeSet<String>,
    pub in_stock: bool,
    pub min_rating: f32,
    pub date_range: Option<DateRange>,
    pub custom: BTreeMap<String, Value>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            categories: BTreeSet::new(),
            price_range: PriceRange::default(),
            vendor_ids: BTreeSet::new(),
            in_stock: false,
            min_rating: 0.0,
            date_range: None,
            custom: BTreeMap::new(),
        }
    }
}

fn check_rating(rating: f32) -> Result<(), SearchError> {
    if !(0.0..=MAX_RATING).contains(&rating) {
        return Err(SearchError::validation(format!(
            "minimum rating must be between 0 and {MAX_RATING} (got {rating})"
        )));
    }
    Ok(())
}

fn toggle_member(set: &mut BTreeSet<String>, value: FilterValue, key: &FilterKey) -> Result<(), SearchError> {
    let FilterValue::Text(member) = value else {
        return Err(SearchError::validation(format!(
            "filter '{key}' expects a text value"
        )));
    };
    if !set.remove(&member) {
        set.insert(member);
    }
    Ok(())
}

impl SearchFilters {
    /// Re-checks invariants that serde cannot express on its own.
    pub fn validate(&self) -> Result<(), SearchError> {
        check_rating(self.min_rating)?;
        if self.categories.iter().any(String::is_empty) || self.vendor_ids.iter().any(String::is_empty) {
            return Err(SearchError::validation("filter ids cannot be empty"));
        }
        Ok(())
    }

    /// Returns a copy with `update` applied, or a validation error leaving
    /// `self` untouched.
    pub fn apply(&self, update: FilterUpdate) -> Result<Self, SearchError> {
        let mut next = self.clone();

        if let Some(categories) = update.categories {
            next.categories = categories;
        }
        if let Some(range) = update.price_range {
            next.price_range = range;
        }
        if let Some(vendors) = update.vendor_ids {
            next.vendor_ids = vendors;
        }
        if let Some(in_stock) = update.in_stock {
            next.in_stock = in_stock;
        }
        if let Some(rating) = update.min_rating {
            check_rating(rating)?;
            next.min_rating = rating;
        }
        if let Some(dates) = update.date_range {
            next.date_range = dates;
        }
        if let Some(custom) = update.custom {
            for (key, value) in custom {
                if value.is_null() {
                    next.custom.remove(&key);
                } else {
                    next.custom.insert(key, value);
                }
            }
        }

        next.validate()?;
        Ok(next)
    }

    /// Toggles one filter dimension.
    ///
    /// Set-valued filters flip membership of `value`, boolean filters are
    /// negated, and scalar filters switch between `value` and their default.
    pub fn toggle(&mut self, key: &FilterKey, value: FilterValue) -> Result<(), SearchError> {
        match key {
            FilterKey::Categories => toggle_member(&mut self.categories, value, key),
            FilterKey::VendorIds => toggle_member(&mut self.vendor_ids, value, key),
            FilterKey::InStock => {
                self.in_stock = !self.in_stock;
                Ok(())
            }
            FilterKey::MinRating => {
                let FilterValue::Number(n) = value else {
                    return Err(SearchError::validation("minRating expects a number"));
                };
                #[allow(clippy::cast_possible_truncation)]
                let rating = n as f32;
                check_rating(rating)?;
                self.min_rating = if (self.min_rating - rating).abs() < f32::EPSILON {
                    0.0
                } else {
                    rating
                };
                Ok(())
            }
            FilterKey::PriceRange => {
                let FilterValue::Price(range) = value else {
                    return Err(SearchError::validation("priceRange expects a price range"));
                };
                self.price_range = if self.price_range == range {
                    PriceRange::default()
                } else {
                    range
                };
                Ok(())
            }
            FilterKey::DateRange => {
                let FilterValue::Dates(range) = value else {
                    return Err(SearchError::validation("dateRange expects a date range"));
                };
                self.date_range = if self.date_range == Some(range) {
                    None
                } else {
                    Some(range)
                };
                Ok(())
            }
            FilterKey::Custom(name) => {
                self.toggle_custom(name, value.into_json());
                Ok(())
            }
        }
    }

    fn toggle_custom(&mut self, name: &str, value: Value) {
        match self.custom.get_mut(name) {
            Some(Value::Array(items)) => {
                if let Some(pos) = items.iter().position(|v| *v == value) {
                    items.remove(pos);
                    if items.is_empty() {
                        self.custom.remove(name);
                    }
                } else {
                    items.push(value);
                }
            }
            Some(Value::Bool(flag)) => {
                *flag = !*flag;
                if !*flag {
                    self.custom.remove(name);
                }
            }
            Some(existing) if *existing == value => {
                self.custom.remove(name);
            }
            _ => {
                self.custom.insert(name.to_string(), value);
            }
        }
    }

    /// Resets one filter dimension to its default.
    pub fn clear(&mut self, key: &FilterKey) {
        let defaults = Self::default();
        match key {
            FilterKey::Categories => self.categories = defaults.categories,
            FilterKey::PriceRange => self.price_range = defaults.price_range,
            FilterKey::VendorIds => self.vendor_ids = defaults.vendor_ids,
            FilterKey::InStock => self.in_stock = defaults.in_stock,
            FilterKey::MinRating => self.min_rating = defaults.min_rating,
            FilterKey::DateRange => self.date_range = defaults.date_range,
            FilterKey::Custom(name) => {
                self.custom.remove(name);
            }
        }
    }

    #[must_use]
    pub fn is_active(&self, key: &FilterKey) -> bool {
        match key {
            FilterKey::Categories => !self.categories.is_empty(),
            FilterKey::PriceRange => !self.price_range.is_default(),
            FilterKey::VendorIds => !self.vendor_ids.is_empty(),
            FilterKey::InStock => self.in_stock,
            FilterKey::MinRating => self.min_rating > 0.0,
            FilterKey::DateRange => self.date_range.is_some(),
            FilterKey::Custom(name) => self.custom.contains_key(name),
        }
    }

    /// Number of filter dimensions that differ from their defaults.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let fixed = [
            FilterKey::Categories,
            FilterKey::PriceRange,
            FilterKey::VendorIds,
            FilterKey::InStock,
            FilterKey::MinRating,
            FilterKey::DateRange,
        ];
        fixed.iter().filter(|k| self.is_active(k)).count() + self.custom.len()
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.active_count() == 0
    }
}
