//! Message types for the batch coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::request::PendingRequest;

/// Internal requests to the coordinator task
#[derive(Debug)]
pub enum BatchRequest {
    /// Buffer a request and reset the debounce timer
    Register(PendingRequest),

    /// Drop everything buffered without delivering
    Cancel,

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<BatchMetrics>,
    },

    /// Flush the buffer, finish in-flight groups, then stop
    Shutdown,
}

/// Counters kept by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub registered: u64,
    pub cancelled: u64,
    #[serde(rename = "flush-cycles")]
    pub flush_cycles: u64,
    pub groups: u64,
    #[serde(rename = "cache-hits")]
    pub cache_hits: u64,
    #[serde(rename = "cache-misses")]
    pub cache_misses: u64,
    pub lookups: u64,
    #[serde(rename = "lookup-failures")]
    pub lookup_failures: u64,
    #[serde(rename = "not-found")]
    pub not_found: u64,
    pub delivered: u64,
    pub buffered: usize,
    #[serde(rename = "in-flight-groups")]
    pub in_flight_groups: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_serialize_kebab_case() {
        let metrics = BatchMetrics {
            flush_cycles: 2,
            cache_hits: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["flush-cycles"], 2);
        assert_eq!(json["cache-hits"], 1);
        assert_eq!(json["in-flight-groups"], 0);
    }
}
