//! In-memory result cache keyed by serialized search parameters.
//!
//! Entries expire after a fixed TTL, checked on read. The cache is also capped:
//! when full, expired entries are pruned and then the oldest entry is evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::SearchResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<SearchResult>,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.ttl
    }

    pub fn get(&mut self, key: &str) -> Option<Arc<SearchResult>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;

        if self.is_fresh(entry, now) {
            return Some(Arc::clone(&entry.result));
        }

        debug!("Cache entry expired: {}", key);
        self.entries.remove(key);
        None
    }

    pub fn insert(&mut self, key: String, result: Arc<SearchResult>) {
        if self.max_entries == 0 {
            return;
        }

        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.prune_expired(now);
        }

        while !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            debug!("Evicting oldest cache entry: {}", oldest);
            self.entries.remove(&oldest);
        }

        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: now,
            },
        );
    }

    fn prune_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.stored_at) < ttl);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
