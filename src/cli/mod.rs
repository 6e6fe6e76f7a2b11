//! CLI module - Command-line driver for the search session
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::SortOrder;

/// marketsearch - Marketplace search from the terminal
#[derive(Parser)]
#[command(name = "marketsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search products
    #[command(alias = "s")]
    Search {
        /// Search query
        query: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Sort order (relevance, price_asc, price_desc, rating, newest, popular)
        #[arg(long, default_value = "relevance")]
        sort: SortOrder,

        /// Results per page
        #[arg(long)]
        limit: Option<u32>,

        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Show autocomplete suggestions for partial input
    #[command(alias = "sg")]
    Suggest {
        #[arg(required = true)]
        input: Vec<String>,
    },

    /// Restore and run a search from a shared query string
    Open {
        /// Query string, e.g. "q=laptop&sort=price_asc"
        query_string: String,
    },

    /// Show the filter options offered by the marketplace
    Filters,

    /// Manage recent searches
    #[command(alias = "h")]
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Manage saved searches
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Category id (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Vendor id (repeatable)
    #[arg(long = "vendor")]
    pub vendors: Vec<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// Only products in stock
    #[arg(long)]
    pub in_stock: bool,

    #[arg(long)]
    pub min_rating: Option<f32>,
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recent searches
    #[command(alias = "ls")]
    List {
        /// Number of entries to show
        #[arg(default_value = "10")]
        limit: usize,
    },
    /// Forget all recent searches
    Clear,
    /// Write history and saved searches as JSON
    Export {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Merge a previously exported JSON document
    Import { path: PathBuf },
}

#[derive(Subcommand)]
pub enum SavedCommands {
    /// List saved searches
    #[command(alias = "ls")]
    List {
        /// Only searches carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Save a search under a name
    Save {
        name: String,
        /// Search query
        query: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, default_value = "relevance")]
        sort: SortOrder,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete a saved search
    #[command(alias = "rm")]
    Delete { id: String },
    /// Run a saved search
    Run { id: String },
}

pub use commands::*;
