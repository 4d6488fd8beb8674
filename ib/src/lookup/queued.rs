//! Lookup routed through the dispatch queue

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::LookupConfig;
use super::query::KeyQuery;
use super::{IssueLookup, SearchOptions, SearchResults};
use crate::error::LookupError;
use crate::queue::DispatchQueue;

const BACKOFF_BASE_MS: u64 = 1000;
const BACKOFF_MAX_MS: u64 = 30_000;

/// Exponential backoff for retry `attempt` (0-based), capped at 30s
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = 2u64
        .checked_pow(attempt)
        .map_or(BACKOFF_MAX_MS, |factor| BACKOFF_BASE_MS.saturating_mul(factor));
    Duration::from_millis(ms.min(BACKOFF_MAX_MS))
}

/// Wraps a lookup so every search is paced by a [`DispatchQueue`]
///
/// Rate-limited searches are re-enqueued after the server's `retry_after`,
/// or exponential backoff when none was given, up to `max_retries` times.
pub struct QueuedLookup {
    inner: Arc<dyn IssueLookup>,
    queue: DispatchQueue,
    max_retries: u32,
}

impl QueuedLookup {
    pub fn new(inner: Arc<dyn IssueLookup>, queue: DispatchQueue, config: &LookupConfig) -> Self {
        debug!(max_retries = config.max_retries, "QueuedLookup::new: called");
        Self {
            inner,
            queue,
            max_retries: config.max_retries,
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }
}

#[async_trait]
impl IssueLookup for QueuedLookup {
    async fn search(&self, query: &KeyQuery, options: &SearchOptions) -> Result<SearchResults, LookupError> {
        let mut attempt = 0;
        loop {
            let inner = Arc::clone(&self.inner);
            let queued_query = query.clone();
            let queued_options = options.clone();
            let result = self
                .queue
                .add(move || async move { inner.search(&queued_query, &queued_options).await })
                .await;

            match result {
                Err(err) if err.is_rate_limit() && attempt < self.max_retries => {
                    let wait = err.retry_after().unwrap_or_else(|| backoff_delay(attempt));
                    warn!(%query, attempt, ?wait, "Rate limited, retrying search");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
