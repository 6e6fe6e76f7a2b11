use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub api: ApiConfig,

    pub search: SearchConfig,

    pub suggestions: SuggestionConfig,

    pub history: HistoryConfig,

    pub scroll: ScrollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Where preferences, history and saved searches are persisted.
    pub state_path: String,

    /// Number of tokio worker threads (default: 1)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        let state_path = dirs::data_dir()
            .map(|d| d.join("marketsearch").join("state.json"))
            .unwrap_or_else(|| PathBuf::from("marketsearch-state.json"));

        Self {
            log_level: "info".to_string(),
            json_logs: false,
            state_path: state_path.display().to_string(),
            worker_threads: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    /// Default per-request timeout in milliseconds (default: 10000)
    pub request_timeout_ms: u64,

    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_ms: 10_000,
            user_agent: "marketsearch/0.1".to_string(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: u32,

    pub max_limit: u32,

    pub min_query_length: usize,

    pub max_query_length: usize,

    pub cache_ttl_seconds: u64,

    /// Upper bound on cached result pages. Oldest entries are evicted first.
    pub max_cache_entries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            min_query_length: 1,
            max_query_length: 200,
            cache_ttl_seconds: 300,
            max_cache_entries: 100,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub debounce_ms: u64,

    pub min_query_length: usize,

    pub max_suggestions: usize,

    /// How many recent searches are blended into the suggestion list.
    pub recent_suggestions: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_length: 2,
            max_suggestions: 8,
            recent_suggestions: 3,
        }
    }
}

impl SuggestionConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_recent: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_recent: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Distance below the viewport at which the sentinel counts as visible.
    pub root_margin_px: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            root_margin_px: 200.0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("marketsearch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".marketsearch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("marketsearch.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            anyhow::bail!("API base URL cannot be empty");
        }
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api.base_url))?;

        if self.search.min_query_length > self.search.max_query_length {
            anyhow::bail!(
                "search.min_query_length ({}) exceeds search.max_query_length ({})",
                self.search.min_query_length,
                self.search.max_query_length
            );
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            anyhow::bail!(
                "search.default_limit must be between 1 and {}",
                self.search.max_limit
            );
        }

        if self.history.max_recent == 0 {
            anyhow::bail!("history.max_recent must be > 0");
        }

        Ok(())
    }
}
