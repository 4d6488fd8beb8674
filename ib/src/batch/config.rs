//! Batch coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period before a flush
pub const DEFAULT_BATCH_DELAY_MS: u64 = 150;

/// Default max keys per lookup call
pub const MAX_BATCH_SIZE: usize = 50;

/// Default max estimated query length per lookup call
pub const MAX_QUERY_LENGTH: usize = 1500;

/// Batch coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Quiet period after the last registration before the buffer is flushed
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Max keys in one lookup call
    #[serde(rename = "max-batch-size", default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Max estimated serialized query length of one lookup call
    #[serde(rename = "max-query-length", default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Emit verbose batching logs
    #[serde(default)]
    pub debug: bool,
}

fn default_batch_delay_ms() -> u64 {
    DEFAULT_BATCH_DELAY_MS
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_max_query_length() -> usize {
    MAX_QUERY_LENGTH
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            max_batch_size: MAX_BATCH_SIZE,
            max_query_length: MAX_QUERY_LENGTH,
            debug: false,
        }
    }
}

impl BatchConfig {
    /// Get the debounce delay as a Duration
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}
