//! Queue state, statistics and errors

use thiserror::Error;

/// Failure of the queue itself, as opposed to a failure of the work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Dispatched request was abandoned before producing a result")]
    Abandoned,
}

/// Statistics for the dispatch queue
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub total_enqueued: u64,
    pub total_started: u64,
    pub total_completed: u64,
    pub total_panicked: u64,
    pub peak_queue_depth: usize,
    pub peak_running: usize,
}

/// Snapshot of the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueState {
    pub pending: usize,
    pub running: usize,
    pub stats: QueueStats,
}
