//! Main batch coordinator task

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use uuid::Uuid;

use super::buffer::PendingBuffer;
use super::config::BatchConfig;
use super::group::group_requests;
use super::handle::BatchHandle;
use super::messages::{BatchMetrics, BatchRequest};
use super::process::{FlushContext, GroupReport, run_group};
use crate::cache::IssueCache;
use crate::lookup::IssueLookup;

/// Debounces, groups and dispatches issue lookups
///
/// The coordinator is a single task that owns the pending buffer and the
/// debounce timer. Every inbound operation arrives as a [`BatchRequest`], so
/// taking the buffer for a flush never interleaves with a registration.
pub struct BatchCoordinator {
    config: BatchConfig,
    ctx: FlushContext,
    tx: mpsc::UnboundedSender<BatchRequest>,
    rx: mpsc::UnboundedReceiver<BatchRequest>,
}

impl BatchCoordinator {
    pub fn new(config: BatchConfig, cache: Arc<dyn IssueCache>, lookup: Arc<dyn IssueLookup>) -> Self {
        batch_debug!(config.debug, ?config, "BatchCoordinator::new: called");
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            ctx: FlushContext {
                cache,
                lookup,
                config: config.clone(),
            },
            config,
            tx,
            rx,
        }
    }

    /// Create a handle for registering requests
    pub fn handle(&self) -> BatchHandle {
        BatchHandle::new(self.tx.clone())
    }

    /// Spawn the coordinator task, returning a handle and the task's join handle
    pub fn spawn(self) -> (BatchHandle, JoinHandle<()>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run());
        (handle, task)
    }

    /// Run the coordinator until shutdown or until every handle is dropped
    ///
    /// On exit the channel is closed, anything still queued in it is taken
    /// in, the buffer is flushed and in-flight groups are awaited. Every
    /// registered request is delivered unless it was cancelled; later
    /// registrations fail with `Closed`.
    pub async fn run(self) {
        let Self { config, ctx, tx, mut rx } = self;
        drop(tx);

        let debug = config.debug;
        let mut state = RunState {
            buffer: PendingBuffer::new(config.batch_delay()),
            in_flight: JoinSet::new(),
            metrics: BatchMetrics::default(),
            debug,
        };

        batch_debug!(debug, batch_delay_ms = config.batch_delay_ms, "BatchCoordinator started");

        loop {
            let expired = state.buffer.expired();
            tokio::select! {
                req = rx.recv() => match req {
                    Some(BatchRequest::Shutdown) => {
                        batch_debug!(debug, "BatchCoordinator shutdown requested");
                        break;
                    }
                    Some(req) => state.handle(req),
                    None => {
                        batch_debug!(debug, "BatchCoordinator: all handles dropped");
                        break;
                    }
                },

                _ = expired => {
                    state.flush(&ctx);
                }

                Some(joined) = state.in_flight.join_next(), if !state.in_flight.is_empty() => {
                    state.record(joined);
                }
            }
        }

        rx.close();
        while let Ok(req) = rx.try_recv() {
            if !matches!(req, BatchRequest::Shutdown) {
                state.handle(req);
            }
        }

        state.flush(&ctx);
        while let Some(joined) = state.in_flight.join_next().await {
            state.record(joined);
        }

        batch_debug!(
            debug,
            flush_cycles = state.metrics.flush_cycles,
            delivered = state.metrics.delivered,
            "BatchCoordinator stopped"
        );
    }
}

/// Everything the coordinator task owns between messages
struct RunState {
    buffer: PendingBuffer,
    in_flight: JoinSet<GroupReport>,
    metrics: BatchMetrics,
    debug: bool,
}

impl RunState {
    fn handle(&mut self, req: BatchRequest) {
        match req {
            BatchRequest::Register(request) => {
                batch_debug!(
                    self.debug,
                    key = %request.key(),
                    identity = %request.identity(),
                    buffered = self.buffer.len() + 1,
                    "BatchCoordinator: registered"
                );
                self.metrics.registered += 1;
                self.buffer.push(request);
            }
            BatchRequest::Cancel => {
                let dropped = self.buffer.clear();
                self.metrics.cancelled += dropped as u64;
                batch_debug!(self.debug, dropped, "BatchCoordinator: cancelled buffered requests");
            }
            BatchRequest::GetMetrics { reply_tx } => {
                self.metrics.buffered = self.buffer.len();
                self.metrics.in_flight_groups = self.in_flight.len();
                let _ = reply_tx.send(self.metrics.clone());
            }
            BatchRequest::Shutdown => {}
        }
    }

    /// Take the whole buffer and start one task per account group
    fn flush(&mut self, ctx: &FlushContext) {
        let requests = self.buffer.take();
        if requests.is_empty() {
            return;
        }

        let cycle = Uuid::now_v7();
        let request_count = requests.len();
        let groups = group_requests(requests);
        self.metrics.flush_cycles += 1;
        self.metrics.groups += groups.len() as u64;

        batch_debug!(
            self.debug,
            %cycle,
            requests = request_count,
            groups = groups.len(),
            "flush: starting cycle"
        );

        for group in groups {
            self.in_flight.spawn(run_group(ctx.clone(), cycle, group));
        }
    }

    fn record(&mut self, joined: Result<GroupReport, JoinError>) {
        match joined {
            Ok(report) => {
                self.metrics.cache_hits += report.cache_hits;
                self.metrics.cache_misses += report.cache_misses;
                self.metrics.lookups += report.lookups;
                self.metrics.lookup_failures += report.lookup_failures;
                self.metrics.not_found += report.not_found;
                self.metrics.delivered += report.delivered;
            }
            Err(e) => batch_warn!(self.debug, error = %e, "BatchCoordinator: group task failed"),
        }
    }
}
