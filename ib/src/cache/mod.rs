//! Result cache collaborator
//!
//! The coordinator only reads entries and upserts them; freshness and
//! eviction belong to the cache implementation.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::Issue;
use crate::error::LookupError;

pub use memory::MemoryCache;

/// A cached lookup outcome, either the issue or the error it resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Result<Issue, LookupError>,
}

impl CacheEntry {
    pub fn is_error(&self) -> bool {
        self.data.is_err()
    }
}

/// Key-value store of lookup outcomes keyed by issue key
#[async_trait]
pub trait IssueCache: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Insert or replace the entry for `key`
    async fn add(&self, key: &str, data: Result<Issue, LookupError>);
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (0 keeps entries until invalidated)
    #[serde(rename = "ttl-secs", default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    15 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 15 * 60 }
    }
}

impl CacheConfig {
    /// Entry lifetime, `None` when entries never expire
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}
