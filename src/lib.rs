pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod services;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, HistoryCommands, SavedCommands};
pub use config::Config;
pub use error::{ErrorKind, SearchError};
pub use services::SearchStore;

/// Installs the global subscriber. `RUST_LOG` overrides `general.log_level`.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;
    init_tracing(&config)?;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    info!("marketsearch v{}", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Search {
            query,
            filters,
            sort,
            limit,
            pages,
        } => cli::cmd_search(&config, &query.join(" "), filters, sort, limit, pages).await,

        Commands::Suggest { input } => cli::cmd_suggest(&config, &input.join(" ")).await,

        Commands::Open { query_string } => cli::cmd_open(&config, &query_string).await,

        Commands::Filters => cli::cmd_filter_options(&config).await,

        Commands::History { command } => match command {
            HistoryCommands::List { limit } => cli::cmd_history_list(&config, limit).await,
            HistoryCommands::Clear => cli::cmd_history_clear(&config).await,
            HistoryCommands::Export { path } => {
                cli::cmd_history_export(&config, path.as_deref()).await
            }
            HistoryCommands::Import { path } => cli::cmd_history_import(&config, &path).await,
        },

        Commands::Saved { command } => match command {
            SavedCommands::List { tag } => cli::cmd_saved_list(&config, tag.as_deref()).await,
            SavedCommands::Save {
                name,
                query,
                filters,
                sort,
                tags,
            } => cli::cmd_saved_save(&config, &name, &query.join(" "), filters, sort, tags).await,
            SavedCommands::Delete { id } => cli::cmd_saved_delete(&config, &id).await,
            SavedCommands::Run { id } => cli::cmd_saved_run(&config, &id).await,
        },

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit marketsearch.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }
    }
}
