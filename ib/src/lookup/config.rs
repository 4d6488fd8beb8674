//! Lookup configuration

use serde::{Deserialize, Serialize};

/// Lookup client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Times a rate-limited search is retried before the error is returned
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}
