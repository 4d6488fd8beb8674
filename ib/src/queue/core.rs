//! Dispatch queue implementation

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::QueueConfig;
use super::types::{QueueError, QueueState, QueueStats};

/// Type-erased work item; settles its caller's channel when run
type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct QueueItem {
    job: Job,
    enqueued_at: Instant,
}

/// Internal state protected by mutex
struct QueueCore {
    config: QueueConfig,

    /// Items not yet started, in arrival order
    pending: VecDeque<QueueItem>,

    /// Slots currently owning an item (pacing wait included)
    running: usize,

    /// Start instant handed to the most recently dispatched item
    last_start: Option<Instant>,

    stats: QueueStats,
}

impl QueueCore {
    fn has_capacity(&self) -> bool {
        self.running < self.config.effective_concurrency()
    }

    /// Reserve the next start instant, at least `delay` after the previous one
    fn reserve_start(&mut self) -> Instant {
        let now = Instant::now();
        let start = match self.last_start {
            Some(last) => (last + self.config.delay()).max(now),
            None => now,
        };
        self.last_start = Some(start);
        self.stats.total_started += 1;
        start
    }
}

type Shared = Arc<Mutex<QueueCore>>;

fn lock(shared: &Shared) -> MutexGuard<'_, QueueCore> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// FIFO executor with a concurrency cap and a global start-to-start delay
///
/// Cloning yields another handle to the same queue. Every item settles its
/// own future; a failing or panicking item never affects its siblings.
#[derive(Clone)]
pub struct DispatchQueue {
    shared: Shared,
}

impl DispatchQueue {
    /// Create a new queue with the given policy
    pub fn new(config: QueueConfig) -> Self {
        debug!(?config, "DispatchQueue::new: called");
        Self {
            shared: Arc::new(Mutex::new(QueueCore {
                config,
                pending: VecDeque::new(),
                running: 0,
                last_start: None,
                stats: QueueStats::default(),
            })),
        }
    }

    /// Enqueue `work` and return a future resolving to its outcome
    ///
    /// `work` is not invoked until the queue starts the item. Enqueueing
    /// happens immediately, before the returned future is polled. Must be
    /// called from within a Tokio runtime.
    pub fn add<F, Fut, T, E>(&self, work: F) -> impl Future<Output = Result<T, E>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let result = work().await;
                let _ = tx.send(result);
            }
            .boxed()
        });

        {
            let mut core = lock(&self.shared);
            core.pending.push_back(QueueItem {
                job,
                enqueued_at: Instant::now(),
            });
            core.stats.total_enqueued += 1;
            core.stats.peak_queue_depth = core.stats.peak_queue_depth.max(core.pending.len());
            debug!(
                pending = core.pending.len(),
                running = core.running,
                "DispatchQueue::add: enqueued"
            );
            fill_slots(&self.shared, &mut core);
        }

        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(E::from(QueueError::Abandoned)),
            }
        }
    }

    /// Replace the active policy
    ///
    /// Applies to items that have not been handed to a slot yet; raising the
    /// concurrency starts extra slots right away.
    pub fn update_config(&self, config: QueueConfig) {
        debug!(?config, "DispatchQueue::update_config: called");
        let mut core = lock(&self.shared);
        core.config = config;
        fill_slots(&self.shared, &mut core);
    }

    /// Current policy
    pub fn config(&self) -> QueueConfig {
        lock(&self.shared).config
    }

    /// Current queue state
    pub fn state(&self) -> QueueState {
        let core = lock(&self.shared);
        QueueState {
            pending: core.pending.len(),
            running: core.running,
            stats: core.stats.clone(),
        }
    }

    /// Get the queue statistics
    pub fn stats(&self) -> QueueStats {
        lock(&self.shared).stats.clone()
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Hand pending items to new slots while capacity remains
fn fill_slots(shared: &Shared, core: &mut QueueCore) {
    while core.has_capacity() {
        let Some(item) = core.pending.pop_front() else {
            break;
        };
        core.running += 1;
        core.stats.peak_running = core.stats.peak_running.max(core.running);
        let start_at = core.reserve_start();
        debug!(running = core.running, "fill_slots: starting slot");
        tokio::spawn(run_slot(Arc::clone(shared), item, start_at));
    }
}

/// One slot: run an item, then keep pulling from the queue until it is empty
/// or the slot is above the (possibly lowered) concurrency cap.
async fn run_slot(shared: Shared, mut item: QueueItem, mut start_at: Instant) {
    loop {
        tokio::time::sleep_until(start_at).await;
        debug!(
            waited_ms = start_at.saturating_duration_since(item.enqueued_at).as_millis() as u64,
            "run_slot: starting item"
        );

        let outcome = AssertUnwindSafe((item.job)()).catch_unwind().await;

        let next = {
            let mut core = lock(&shared);
            core.stats.total_completed += 1;
            if outcome.is_err() {
                core.stats.total_panicked += 1;
                warn!("run_slot: work item panicked");
            }

            if core.running <= core.config.effective_concurrency()
                && let Some(next) = core.pending.pop_front()
            {
                Some((next, core.reserve_start()))
            } else {
                core.running -= 1;
                None
            }
        };

        match next {
            Some((next_item, next_start)) => {
                item = next_item;
                start_at = next_start;
            }
            None => {
                debug!("run_slot: queue drained, slot exiting");
                return;
            }
        }
    }
}
