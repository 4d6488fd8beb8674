//! Buffered requests and the debounce timer

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::request::PendingRequest;

/// Single-slot cancellable deadline
#[derive(Debug, Default)]
pub struct DebounceTimer {
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// (Re)arm the timer to fire `delay` from now
    pub fn reset(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Future completing at the current deadline; never completes when disarmed
    ///
    /// Captures the deadline by value, so a later reset needs a fresh call.
    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        }
    }
}

/// Requests waiting for the next flush, paired with the debounce timer
///
/// Non-empty exactly when the timer is armed.
#[derive(Debug)]
pub struct PendingBuffer {
    requests: Vec<PendingRequest>,
    timer: DebounceTimer,
    delay: Duration,
}

impl PendingBuffer {
    pub fn new(delay: Duration) -> Self {
        Self {
            requests: Vec::new(),
            timer: DebounceTimer::default(),
            delay,
        }
    }

    /// Buffer a request and push the flush back to `delay` from now
    pub fn push(&mut self, request: PendingRequest) {
        self.requests.push(request);
        self.timer.reset(self.delay);
    }

    /// Take everything for a flush, disarming the timer
    pub fn take(&mut self) -> Vec<PendingRequest> {
        self.timer.cancel();
        std::mem::take(&mut self.requests)
    }

    /// Drop everything without delivering; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        self.timer.cancel();
        let dropped = self.requests.len();
        self.requests.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn timer(&self) -> &DebounceTimer {
        &self.timer
    }

    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        self.timer.expired()
    }
}
