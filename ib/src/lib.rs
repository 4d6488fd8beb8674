//! issuebatch - debounced, grouped, rate-limited issue lookups
//!
//! Many independent callers each want the current state of one issue key,
//! usually in bursts (a document rendering many inline references). The
//! crate merges those requests into as few lookup calls as possible and
//! fans every result back to its callers, exactly once each.
//!
//! # Core Concepts
//!
//! - **Debounce**: requests are buffered until registrations pause
//! - **Grouping**: keys are batched per account, never across accounts
//! - **Chunking**: each lookup stays within a key-count and query-length budget
//! - **Pacing**: lookup calls go through a concurrency- and delay-limited queue
//!
//! # Modules
//!
//! - [`batch`] - Batch coordinator task and its handle
//! - [`queue`] - Rate-limited dispatch queue
//! - [`lookup`] - Lookup collaborator trait, query descriptor, queued and file-backed lookups
//! - [`cache`] - Result cache collaborator and in-memory TTL cache
//! - [`keys`] - Issue key extraction from text
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod keys;
pub mod lookup;
pub mod queue;

// Re-export commonly used types
pub use batch::{BatchConfig, BatchCoordinator, BatchHandle, BatchMetrics, RequestOptions};
pub use cache::{CacheConfig, CacheEntry, IssueCache, MemoryCache};
pub use config::Config;
pub use domain::{Account, Issue};
pub use error::{ErrorKind, LookupError};
pub use lookup::{FixtureLookup, IssueLookup, KeyQuery, LookupConfig, QueuedLookup, SearchOptions, SearchResults};
pub use queue::{DispatchQueue, QueueConfig, QueueError, QueueState, QueueStats};
