//! Batch coordinator
//!
//! Callers register single-key lookups; the coordinator buffers them until a
//! quiet period passes, groups them by account, packs each group's uncached
//! keys into bounded chunks and fans every result back to its callers.

/// Verbose batch logging, emitted only when `$enabled` is true
macro_rules! batch_debug {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!($($arg)+);
        }
    };
}

macro_rules! batch_warn {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::warn!($($arg)+);
        }
    };
}

mod buffer;
mod chunk;
mod config;
mod core;
mod global;
mod group;
mod handle;
mod messages;
mod process;
mod request;

pub use buffer::{DebounceTimer, PendingBuffer};
pub use chunk::chunk_keys;
pub use config::{BatchConfig, DEFAULT_BATCH_DELAY_MS, MAX_BATCH_SIZE, MAX_QUERY_LENGTH};
pub use core::BatchCoordinator;
pub use global::{global_handle, try_global_handle};
pub use group::{AccountBatchGroup, group_requests};
pub use handle::BatchHandle;
pub use messages::{BatchMetrics, BatchRequest};
pub use request::{PendingRequest, RequestOptions};
