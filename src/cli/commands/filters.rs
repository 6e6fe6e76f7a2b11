use crate::config::Config;

use super::build_store;

pub async fn cmd_filter_options(config: &Config) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let options = store.load_filter_options().await;

    println!("Categories:");
    for category in &options.categories {
        println!("  {} - {}", category.id, category.name);
    }

    println!();
    println!("Vendors:");
    for vendor in &options.vendors {
        println!(
            "  {} - {} ({} products)",
            vendor.id, vendor.name, vendor.product_count
        );
    }

    println!();
    println!("Price ranges:");
    for range in &options.price_ranges {
        println!("  {} ({})", range.label, range.count);
    }
    Ok(())
}
