//! Persistence boundary for the store.
//!
//! Only a whitelisted subset of the session survives restarts: filters, sort,
//! view mode, page size and history. Results, cache, loading flags, errors and
//! suggestions are rebuilt every session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::history::SearchHistory;
use crate::domain::{SearchFilters, SortOrder, ViewMode};

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub view_mode: ViewMode,
    pub limit: Option<u32>,
    #[serde(default)]
    pub history: SearchHistory,
}

/// Key-value style storage for the persisted document.
pub trait StateStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, contents: &str) -> Result<()>;
}

/// Stores the document as a JSON file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn save(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;
        debug!("State saved to {}", self.path.display());
        Ok(())
    }
}

/// Process-local storage, mostly useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        let guard = self
            .contents
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, contents: &str) -> Result<()> {
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        *guard = Some(contents.to_string());
        Ok(())
    }
}

/// Loads the persisted document. Missing, unreadable or corrupt documents
/// yield `None` so the session starts from defaults.
pub fn load_state(storage: &dyn StateStorage) -> Option<PersistedState> {
    let raw = match storage.load() {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not read persisted search state: {e:#}");
            return None;
        }
    };

    match serde_json::from_str::<PersistedState>(&raw) {
        Ok(state) if state.version == STATE_VERSION => Some(state),
        Ok(state) => {
            warn!(
                "Ignoring persisted search state with version {}",
                state.version
            );
            None
        }
        Err(e) => {
            warn!("Ignoring corrupt persisted search state: {e}");
            None
        }
    }
}

pub fn save_state(storage: &dyn StateStorage, state: &PersistedState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("Failed to serialize search state")?;
    storage.save(&json)
}
