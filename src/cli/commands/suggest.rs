use crate::config::Config;
use crate::services::SuggestionPhase;

use super::build_store;

pub async fn cmd_suggest(config: &Config, input: &str) -> anyhow::Result<()> {
    let store = build_store(config)?;

    match store.get_suggestions(input).await {
        Some(SuggestionPhase::Populated) => {
            for suggestion in store.suggestions().await {
                let count = suggestion
                    .count
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default();
                println!("• [{:?}] {}{}", suggestion.kind, suggestion.text, count);
            }
        }
        Some(SuggestionPhase::Idle) => {
            println!(
                "Type at least {} characters for suggestions.",
                config.suggestions.min_query_length
            );
        }
        Some(SuggestionPhase::Error) => println!("Suggestions are unavailable right now."),
        _ => println!("No suggestions for '{input}'"),
    }
    Ok(())
}
