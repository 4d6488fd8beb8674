//! Rate-limited dispatch queue
//!
//! Runs arbitrary async work items in FIFO order under a concurrency cap and
//! a minimum delay between consecutive starts, measured across the whole queue.

mod config;
mod core;
mod types;

pub use config::QueueConfig;
pub use core::DispatchQueue;
pub use types::{QueueError, QueueState, QueueStats};
