use crate::cli::FilterArgs;
use crate::config::Config;
use crate::domain::{SearchRequest, SortOrder};

use super::{TELEMETRY_FLUSH, build_store, print_results};

pub async fn cmd_search(
    config: &Config,
    query: &str,
    filters: FilterArgs,
    sort: SortOrder,
    limit: Option<u32>,
    pages: u32,
) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let filters = filters.into_filters()?;

    let mut request = SearchRequest::query(query)
        .with_filters(filters)
        .with_sort(sort);
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }

    println!("Searching for: {query}");
    let mut result = store.search(request).await?;

    for _ in 1..pages {
        match store.load_more().await? {
            Some(next) => result = next,
            None => break,
        }
    }

    print_results(&result);
    println!();
    println!("Share: ?{}", store.url_query().await);
    store.flush_telemetry(TELEMETRY_FLUSH).await;
    Ok(())
}

pub async fn cmd_open(config: &Config, query_string: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;

    match store.restore_from_url(query_string).await? {
        Some(result) => print_results(&result),
        None => println!("Nothing to search for in '{query_string}'"),
    }
    store.flush_telemetry(TELEMETRY_FLUSH).await;
    Ok(())
}
