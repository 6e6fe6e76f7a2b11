use anyhow::Context;
use std::path::Path;

use crate::config::Config;

use super::build_store;

pub async fn cmd_history_list(config: &Config, limit: usize) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let recent = store.recent_searches().await;

    if recent.is_empty() {
        println!("No recent searches.");
        return Ok(());
    }

    println!("Recent Searches (last {}):", recent.len().min(limit));
    println!("{:-<70}", "");

    for term in recent.iter().take(limit) {
        let filters = term.filters.active_count();
        println!("• {} - {} results", term.query, term.result_count);
        println!(
            "  {} | {} active filters",
            term.timestamp.format("%Y-%m-%d %H:%M"),
            filters
        );
    }
    Ok(())
}

pub async fn cmd_history_clear(config: &Config) -> anyhow::Result<()> {
    let store = build_store(config)?;
    store.clear_history().await;
    println!("✓ Recent searches cleared.");
    Ok(())
}

pub async fn cmd_history_export(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let json = store.export_history().await?;

    match path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ History exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn cmd_history_import(config: &Config, path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let store = build_store(config)?;
    let summary = store.import_history(&json).await?;

    println!(
        "✓ Imported {} recent searches and {} saved searches ({} already present)",
        summary.recent_merged, summary.saved_added, summary.saved_skipped
    );
    Ok(())
}
