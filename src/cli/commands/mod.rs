mod filters;
mod history;
mod saved;
mod search;
mod suggest;

pub use filters::cmd_filter_options;
pub use history::{cmd_history_clear, cmd_history_export, cmd_history_import, cmd_history_list};
pub use saved::{cmd_saved_delete, cmd_saved_list, cmd_saved_run, cmd_saved_save};
pub use search::{cmd_open, cmd_search};
pub use suggest::cmd_suggest;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use super::FilterArgs;
use crate::clients::search_api::HttpSearchApi;
use crate::config::Config;
use crate::domain::{DEFAULT_MAX_PRICE, PriceRange, SearchFilters};
use crate::models::SearchResult;
use crate::services::{FileStorage, SearchStore};

/// How long a command waits for analytics posts before exiting.
pub(crate) const TELEMETRY_FLUSH: Duration = Duration::from_secs(2);

pub(crate) fn build_store(config: &Config) -> anyhow::Result<Arc<SearchStore>> {
    let api = HttpSearchApi::from_config(&config.api).context("Failed to build API client")?;
    let storage = FileStorage::new(&config.general.state_path);
    Ok(Arc::new(SearchStore::new(
        Arc::new(api),
        Arc::new(storage),
        config,
    )))
}

impl FilterArgs {
    pub fn into_filters(self) -> anyhow::Result<SearchFilters> {
        let mut filters = SearchFilters {
            categories: self.categories.into_iter().collect(),
            vendor_ids: self.vendors.into_iter().collect(),
            in_stock: self.in_stock,
            min_rating: self.min_rating.unwrap_or(0.0),
            ..SearchFilters::default()
        };

        if self.min_price.is_some() || self.max_price.is_some() {
            filters.price_range = PriceRange::new(
                self.min_price.unwrap_or(0.0),
                self.max_price.unwrap_or(DEFAULT_MAX_PRICE),
            )?;
        }

        filters.validate()?;
        Ok(filters)
    }
}

pub(crate) fn print_results(result: &SearchResult) {
    let pagination = &result.pagination;

    if result.products.is_empty() {
        println!("No products found for '{}'", result.query);
        if let Some(hint) = &result.did_you_mean {
            println!("Did you mean: {hint}?");
        }
        return;
    }

    println!(
        "{} products (page {}/{}, {} ms)",
        result.total_found(),
        pagination.page,
        pagination.total_pages.max(1),
        result.search_time_ms
    );
    println!("{:-<70}", "");

    for product in &result.products {
        let stock = if product.in_stock { "" } else { " [out of stock]" };
        let discount = product
            .discount_percent()
            .map(|d| format!(" (-{d}%)"))
            .unwrap_or_default();
        println!(
            "• {} - {:.2} {}{}{}",
            product.name, product.price, product.currency, discount, stock
        );
        if let Some(vendor) = &product.vendor_name {
            println!("  Vendor: {} | ID: {}", vendor, product.id);
        }
    }

    if pagination.has_next {
        println!();
        println!("More results available (use --pages to load more).");
    }
}
