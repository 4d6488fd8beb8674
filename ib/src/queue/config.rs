//! Dispatch queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatch queue policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Minimum time between the start of one item and the start of the next
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Max items running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_delay_ms() -> u64 {
    100
}

fn default_concurrency() -> usize {
    1
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delay_ms: 100,
            concurrency: 1,
        }
    }
}

impl QueueConfig {
    pub fn new(delay_ms: u64, concurrency: usize) -> Self {
        Self { delay_ms, concurrency }
    }

    /// Get the start-to-start delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Concurrency cap actually enforced (never below one)
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
