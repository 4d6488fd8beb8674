//! In-memory cache with time-based expiry

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheConfig, CacheEntry, IssueCache};
use crate::domain::Issue;
use crate::error::LookupError;

struct StoredEntry {
    entry: CacheEntry,
    stored_at: Instant,
}

/// Process-local [`IssueCache`] with a single TTL for items and errors
pub struct MemoryCache {
    entries: RwLock<HashMap<String, StoredEntry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        debug!(?config, "MemoryCache::new: called");
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: config.ttl(),
        }
    }

    fn is_live(&self, stored: &StoredEntry) -> bool {
        match self.ttl {
            Some(ttl) => stored.stored_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Drop the entry for `key`, returning whether one existed
    pub async fn invalidate(&self, key: &str) -> bool {
        debug!(%key, "MemoryCache::invalidate: called");
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry
    pub async fn clear(&self) {
        debug!("MemoryCache::clear: called");
        self.entries.write().await.clear();
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|stored| self.is_live(stored)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl IssueCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(stored) if self.is_live(stored) => return Some(stored.entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(stored) = entries.get(key)
            && !self.is_live(stored)
        {
            entries.remove(key);
        }
        None
    }

    async fn add(&self, key: &str, data: Result<Issue, LookupError>) {
        self.entries.write().await.insert(
            key.to_string(),
            StoredEntry {
                entry: CacheEntry { data },
                stored_at: Instant::now(),
            },
        );
    }
}
