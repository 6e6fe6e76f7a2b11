use anyhow::Context;

use crate::cli::FilterArgs;
use crate::config::Config;
use crate::domain::{SavedSearchId, SortOrder};

use super::{TELEMETRY_FLUSH, build_store, print_results};

fn parse_id(id: &str) -> anyhow::Result<SavedSearchId> {
    id.parse()
        .with_context(|| format!("Invalid saved search id: {id}"))
}

pub async fn cmd_saved_list(config: &Config, tag: Option<&str>) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let saved = match tag {
        Some(tag) => store.saved_searches_by_tag(tag).await,
        None => store.saved_searches().await,
    };

    if saved.is_empty() {
        println!("No saved searches.");
        return Ok(());
    }

    for search in saved {
        println!("[{}] {}", search.id, search.name);
        println!(
            "    Query: '{}' | Sort: {} | Filters: {}",
            search.query,
            search.sort,
            search.filters.active_count()
        );
        if !search.tags.is_empty() {
            println!("    Tags: {}", search.tags.join(", "));
        }
        if let Some(used) = search.last_used_at {
            println!("    Last used: {}", used.format("%Y-%m-%d %H:%M"));
        }
    }

    if tag.is_none() {
        let tags = store.all_tags().await;
        if !tags.is_empty() {
            println!();
            println!("All tags: {}", tags.join(", "));
        }
    }
    Ok(())
}

pub async fn cmd_saved_save(
    config: &Config,
    name: &str,
    query: &str,
    filters: FilterArgs,
    sort: SortOrder,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let filters = filters.into_filters()?;
    let saved = store.save_search(name, query, filters, sort, tags).await?;
    println!("✓ Saved '{}' ({})", saved.name, saved.id);
    Ok(())
}

pub async fn cmd_saved_delete(config: &Config, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = build_store(config)?;

    if store.delete_saved_search(id).await {
        println!("✓ Deleted saved search {id}");
    } else {
        println!("No saved search with id {id}");
    }
    Ok(())
}

pub async fn cmd_saved_run(config: &Config, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = build_store(config)?;
    let result = store.load_saved_search(id).await?;
    print_results(&result);
    store.flush_telemetry(TELEMETRY_FLUSH).await;
    Ok(())
}
