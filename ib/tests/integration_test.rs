//! Integration tests for issuebatch
//!
//! These tests drive the coordinator end to end with in-test collaborators
//! on a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use issuebatch::batch::{BatchConfig, BatchCoordinator, BatchHandle, RequestOptions};
use issuebatch::domain::{Account, Issue, group_identity};
use issuebatch::{
    DispatchQueue, IssueCache, IssueLookup, KeyQuery, LookupConfig, LookupError, MemoryCache, QueueConfig,
    QueuedLookup, SearchOptions, SearchResults,
};

type Outcome = (String, Result<Issue, LookupError>);

/// One recorded search call
#[derive(Debug, Clone)]
struct Call {
    identity: String,
    query: String,
    at: Instant,
}

/// Lookup serving a fixed issue set, recording every call
#[derive(Default)]
struct MockLookup {
    issues: Vec<Issue>,
    fail_with: Option<LookupError>,
    latency: Duration,
    calls: Mutex<Vec<Call>>,
}

impl MockLookup {
    fn serving(keys: &[&str]) -> Self {
        Self {
            issues: keys.iter().map(|k| Issue::new(*k)).collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.query).collect()
    }
}

#[async_trait]
impl IssueLookup for MockLookup {
    async fn search(&self, query: &KeyQuery, options: &SearchOptions) -> Result<SearchResults, LookupError> {
        self.calls.lock().unwrap().push(Call {
            identity: group_identity(options.account.as_ref()).to_string(),
            query: query.to_string(),
            at: Instant::now(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(SearchResults {
            issues: self.issues.iter().filter(|i| query.contains(&i.key)).cloned().collect(),
        })
    }
}

/// Collects every callback invocation
#[derive(Clone, Default)]
struct Sink(Arc<Mutex<Vec<Outcome>>>);

impl Sink {
    fn options(&self, key: &str) -> RequestOptions {
        let (ok, err) = (self.0.clone(), self.0.clone());
        let (ok_key, err_key) = (key.to_string(), key.to_string());
        RequestOptions::new(
            move |issue| ok.lock().unwrap().push((ok_key, Ok(issue))),
            move |e| err.lock().unwrap().push((err_key, Err(e))),
        )
    }

    fn outcomes(&self) -> Vec<Outcome> {
        self.0.lock().unwrap().clone()
    }

    fn outcome(&self, key: &str) -> Vec<Result<Issue, LookupError>> {
        self.outcomes()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, r)| r)
            .collect()
    }
}

fn start(lookup: Arc<MockLookup>, cache: Arc<MemoryCache>, config: BatchConfig) -> BatchHandle {
    let (handle, _task) = BatchCoordinator::new(config, cache, lookup).spawn();
    handle
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

// =============================================================================
// Flush semantics
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_found_and_not_found_scenario() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));
    let cache = Arc::new(MemoryCache::default());
    let handle = start(lookup.clone(), cache.clone(), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    settle().await;

    assert_eq!(sink.outcome("ABC-1"), vec![Ok(Issue::new("ABC-1"))]);
    assert_eq!(sink.outcome("ABC-2"), vec![Err(LookupError::not_found("ABC-2"))]);
    assert_eq!(
        sink.outcome("ABC-2")[0].as_ref().unwrap_err().to_string(),
        "Issue not found: ABC-2"
    );

    assert_eq!(cache.get("ABC-1").await.unwrap().data, Ok(Issue::new("ABC-1")));
    assert!(cache.get("ABC-2").await.unwrap().is_error());
    assert_eq!(lookup.queries(), vec!["key in (ABC-1, ABC-2)"]);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_into_one_cycle() {
    let keys: Vec<String> = (1..=120).map(|i| format!("ABC-{i}")).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let lookup = Arc::new(MockLookup::serving(&key_refs));
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    for key in &keys {
        handle.register_issue(key.as_str(), sink.options(key));
    }
    settle().await;

    let metrics = handle.metrics().await.unwrap();
    assert_eq!(metrics.flush_cycles, 1);
    assert_eq!(metrics.lookups, 3);
    assert_eq!(metrics.delivered, 120);
    assert_eq!(lookup.calls().len(), 3);
    assert!(sink.outcomes().iter().all(|(_, r)| r.is_ok()));
}

#[tokio::test(start_paused = true)]
async fn test_continuous_stream_defers_flush() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    for _ in 0..10 {
        handle.register_issue("ABC-1", sink.options("ABC-1"));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(sink.outcomes().is_empty());
    assert!(lookup.calls().is_empty());

    settle().await;
    assert_eq!(sink.outcome("ABC-1").len(), 10);
    assert_eq!(lookup.calls().len(), 1);
    assert_eq!(handle.metrics().await.unwrap().flush_cycles, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_keys_share_one_lookup() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-1", sink.options("ABC-1"));
    settle().await;

    assert_eq!(lookup.queries(), vec!["key in (ABC-1)"]);
    assert_eq!(sink.outcome("ABC-1"), vec![Ok(Issue::new("ABC-1")), Ok(Issue::new("ABC-1"))]);
}

#[tokio::test(start_paused = true)]
async fn test_accounts_never_share_a_chunk() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1", "OPS-1"]));
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();
    let work = Account::new("work", "https://work.example.com");

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("OPS-1", sink.options("OPS-1").with_account(work.clone()));
    settle().await;

    let mut calls: Vec<(String, String)> = lookup.calls().into_iter().map(|c| (c.identity, c.query)).collect();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            ("fallback".to_string(), "key in (ABC-1)".to_string()),
            ("work".to_string(), "key in (OPS-1)".to_string()),
        ]
    );
    assert_eq!(handle.metrics().await.unwrap().groups, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cached_keys_short_circuit() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1", "ABC-2", "ABC-3"]));
    let cache = Arc::new(MemoryCache::default());
    cache.add("ABC-1", Ok(Issue::new("ABC-1"))).await;
    cache.add("ABC-2", Err(LookupError::transport("401 Unauthorized"))).await;
    let handle = start(lookup.clone(), cache, BatchConfig::default());
    let sink = Sink::default();

    for key in ["ABC-1", "ABC-2", "ABC-3"] {
        handle.register_issue(key, sink.options(key));
    }
    settle().await;

    assert_eq!(lookup.queries(), vec!["key in (ABC-3)"]);
    assert_eq!(sink.outcome("ABC-2"), vec![Err(LookupError::transport("401 Unauthorized"))]);
    assert!(sink.outcome("ABC-3")[0].is_ok());

    let metrics = handle.metrics().await.unwrap();
    assert_eq!(metrics.cache_hits, 2);
    assert_eq!(metrics.cache_misses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_results_are_independent() {
    let lookup = Arc::new(MockLookup::serving(&["A-1", "C-1"]));
    let handle = start(lookup, Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    for key in ["A-1", "B-1", "C-1"] {
        handle.register_issue(key, sink.options(key));
    }
    settle().await;

    assert!(sink.outcome("A-1")[0].is_ok());
    assert_eq!(sink.outcome("B-1"), vec![Err(LookupError::not_found("B-1"))]);
    assert!(sink.outcome("C-1")[0].is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_lookup_failure_is_cached_per_key() {
    let lookup = Arc::new(MockLookup {
        fail_with: Some(LookupError::transport("503 Service Unavailable")),
        ..Default::default()
    });
    let cache = Arc::new(MemoryCache::default());
    let handle = start(lookup.clone(), cache.clone(), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    settle().await;

    for key in ["ABC-1", "ABC-2"] {
        assert_eq!(
            sink.outcome(key),
            vec![Err(LookupError::transport("503 Service Unavailable"))]
        );
        assert!(cache.get(key).await.unwrap().is_error());
    }

    // a later render short-circuits on the cached error
    handle.register_issue("ABC-1", sink.options("ABC-1"));
    settle().await;
    assert_eq!(lookup.calls().len(), 1);
    assert_eq!(sink.outcome("ABC-1").len(), 2);
}

// =============================================================================
// Cancellation and lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_buffered_silently() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    handle.cancel();
    settle().await;

    assert!(sink.outcomes().is_empty());
    assert!(lookup.calls().is_empty());

    // state is clean: a fresh registration behaves normally
    handle.register_issue("ABC-1", sink.options("ABC-1"));
    settle().await;
    assert_eq!(sink.outcome("ABC-1"), vec![Ok(Issue::new("ABC-1"))]);
    assert_eq!(handle.metrics().await.unwrap().cancelled, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_does_not_touch_in_flight_requests() {
    let lookup = Arc::new(MockLookup {
        issues: vec![Issue::new("ABC-1")],
        latency: Duration::from_secs(1),
        ..Default::default()
    });
    let handle = start(lookup, Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    // past the debounce, inside the lookup latency
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();
    settle().await;

    assert_eq!(sink.outcome("ABC-1"), vec![Ok(Issue::new("ABC-1"))]);
}

#[tokio::test(start_paused = true)]
async fn test_registration_during_flush_starts_new_cycle() {
    let lookup = Arc::new(MockLookup {
        issues: vec![Issue::new("ABC-1"), Issue::new("ABC-2")],
        latency: Duration::from_secs(1),
        ..Default::default()
    });
    let handle = start(lookup.clone(), Arc::new(MemoryCache::default()), BatchConfig::default());
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    settle().await;

    assert_eq!(lookup.queries(), vec!["key in (ABC-1)", "key in (ABC-2)"]);
    assert_eq!(sink.outcomes().len(), 2);
    assert_eq!(handle.metrics().await.unwrap().flush_cycles, 2);
}

#[tokio::test(start_paused = true)]
async fn test_every_request_delivered_exactly_once() {
    let lookup = Arc::new(MockLookup::serving(&["A-1", "A-3"]));
    let handle = start(
        lookup,
        Arc::new(MemoryCache::default()),
        BatchConfig {
            max_batch_size: 2,
            ..Default::default()
        },
    );
    let sink = Sink::default();

    let keys = ["A-1", "A-2", "A-3", "A-1", "A-4", "A-3"];
    for key in keys {
        handle.register_issue(key, sink.options(key));
    }
    settle().await;

    assert_eq!(sink.outcomes().len(), keys.len());
    for key in ["A-1", "A-2", "A-3", "A-4"] {
        let expected = keys.iter().filter(|k| **k == key).count();
        assert_eq!(sink.outcome(key).len(), expected, "{key}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_delivers_buffered_requests() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));
    let (handle, task) = BatchCoordinator::new(
        BatchConfig::default(),
        Arc::new(MemoryCache::default()),
        lookup,
    )
    .spawn();

    let (tx, rx) = tokio::sync::oneshot::channel();
    handle.register_issue("ABC-1", RequestOptions::channel(tx));
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert_eq!(rx.await.unwrap(), Ok(Issue::new("ABC-1")));
    assert_eq!(handle.resolve("ABC-1", None).await, Err(LookupError::Closed));
}

#[tokio::test(start_paused = true)]
async fn test_register_queued_behind_shutdown_still_resolves() {
    let lookup = Arc::new(MockLookup::serving(&["ABC-1", "ABC-2"]));
    let (handle, task) = BatchCoordinator::new(BatchConfig::default(), Arc::new(MemoryCache::default()), lookup.clone()).spawn();
    let other = handle.clone();
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.shutdown().await.unwrap();
    other.register_issue("ABC-2", sink.options("ABC-2"));
    task.await.unwrap();
    settle().await;

    assert_eq!(sink.outcome("ABC-1"), vec![Ok(Issue::new("ABC-1"))]);
    assert_eq!(sink.outcome("ABC-2"), vec![Ok(Issue::new("ABC-2"))]);
    assert_eq!(lookup.queries(), vec!["key in (ABC-1, ABC-2)"]);
}

#[tokio::test(start_paused = true)]
async fn test_register_after_stop_reports_closed() {
    let (handle, task) = BatchCoordinator::new(
        BatchConfig::default(),
        Arc::new(MemoryCache::default()),
        Arc::new(MockLookup::serving(&["ABC-1"])),
    )
    .spawn();
    let sink = Sink::default();

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    handle.register_issue("ABC-1", sink.options("ABC-1"));

    assert_eq!(sink.outcome("ABC-1"), vec![Err(LookupError::Closed)]);
    assert!(handle.is_closed());
}

// =============================================================================
// Coordinator behind the dispatch queue
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_groups_paced_through_dispatch_queue() {
    let mock = Arc::new(MockLookup::serving(&["ABC-1", "OPS-1", "DEV-1"]));
    let queue = DispatchQueue::new(QueueConfig::new(100, 1));
    let lookup = Arc::new(QueuedLookup::new(mock.clone(), queue.clone(), &LookupConfig::default()));
    let (handle, _task) = BatchCoordinator::new(BatchConfig::default(), Arc::new(MemoryCache::default()), lookup).spawn();
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("OPS-1", sink.options("OPS-1").with_account(Account::new("ops", "")));
    handle.register_issue("DEV-1", sink.options("DEV-1").with_account(Account::new("dev", "")));
    settle().await;

    let calls = mock.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(100));
    }
    assert_eq!(queue.stats().total_completed, 3);
    assert_eq!(sink.outcomes().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retried_below_coordinator() {
    /// Rate limits the first call only
    struct LimitedOnce {
        inner: MockLookup,
        limited: Mutex<bool>,
    }

    #[async_trait]
    impl IssueLookup for LimitedOnce {
        async fn search(&self, query: &KeyQuery, options: &SearchOptions) -> Result<SearchResults, LookupError> {
            let first = std::mem::replace(&mut *self.limited.lock().unwrap(), false);
            if first {
                return Err(LookupError::RateLimited {
                    retry_after: Some(Duration::from_secs(2)),
                });
            }
            self.inner.search(query, options).await
        }
    }

    let limited = Arc::new(LimitedOnce {
        inner: MockLookup::serving(&["ABC-1"]),
        limited: Mutex::new(true),
    });
    let lookup = Arc::new(QueuedLookup::new(
        limited,
        DispatchQueue::new(QueueConfig::new(0, 1)),
        &LookupConfig::default(),
    ));
    let (handle, _task) = BatchCoordinator::new(BatchConfig::default(), Arc::new(MemoryCache::default()), lookup).spawn();

    assert_eq!(handle.resolve("ABC-1", None).await, Ok(Issue::new("ABC-1")));
    assert_eq!(handle.metrics().await.unwrap().lookup_failures, 0);
}

// =============================================================================
// Debug logging
// =============================================================================

/// Writer collecting formatted log output
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Run a full coordinator lifetime with every event captured
async fn captured_run(debug: bool) -> String {
    let capture = LogCapture::default();
    let cache = Arc::new(MemoryCache::default());
    let lookup = Arc::new(MockLookup::serving(&["ABC-1"]));

    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = BatchConfig {
        debug,
        ..Default::default()
    };
    let (handle, task) = BatchCoordinator::new(config, cache, lookup).spawn();
    let sink = Sink::default();

    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    handle.register_issue("ABC-3", sink.options("ABC-3"));
    handle.cancel();
    handle.register_issue("ABC-1", sink.options("ABC-1"));
    handle.register_issue("ABC-2", sink.options("ABC-2"));
    settle().await;
    handle.register_issue("ABC-1", sink.options("ABC-1"));
    settle().await;
    handle.metrics().await.unwrap();
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert_eq!(sink.outcome("ABC-1").len(), 2);
    assert_eq!(sink.outcome("ABC-2"), vec![Err(LookupError::not_found("ABC-2"))]);
    assert!(sink.outcome("ABC-3").is_empty());
    capture.contents()
}

#[tokio::test(start_paused = true)]
async fn test_no_log_output_without_debug() {
    let output = captured_run(false).await;
    assert!(output.is_empty(), "unexpected log output: {output}");
}

#[tokio::test(start_paused = true)]
async fn test_debug_flag_enables_log_output() {
    let output = captured_run(true).await;
    assert!(output.contains("BatchCoordinator started"));
    assert!(output.contains("process_group: cache hit"));
}
