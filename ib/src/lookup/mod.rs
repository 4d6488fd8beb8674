//! Lookup collaborator: the service that resolves a set of keys in one call

mod config;
mod fixture;
mod query;
mod queued;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Issue};
use crate::error::LookupError;

pub use config::LookupConfig;
pub use fixture::FixtureLookup;
pub use query::{KEY_SEPARATOR, KeyQuery, QUERY_OVERHEAD, estimated_query_length};
pub use queued::{QueuedLookup, backoff_delay};

/// Options for one search call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Max issues to return
    pub limit: usize,

    /// Account to search under; `None` uses the fallback account
    pub account: Option<Account>,
}

/// Issues matched by a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub issues: Vec<Issue>,
}

/// A service that can look up many issues by key in one request
///
/// Keys absent from the results simply were not matched; an `Err` means the
/// call itself failed.
#[async_trait]
pub trait IssueLookup: Send + Sync {
    async fn search(&self, query: &KeyQuery, options: &SearchOptions) -> Result<SearchResults, LookupError>;
}
