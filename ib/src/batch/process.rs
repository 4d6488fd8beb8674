//! Per-group flush work: cache check, chunked lookups, fan-out

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use super::chunk::chunk_keys;
use super::config::BatchConfig;
use super::group::AccountBatchGroup;
use crate::cache::IssueCache;
use crate::domain::Issue;
use crate::error::LookupError;
use crate::lookup::{IssueLookup, KeyQuery, SearchOptions};

/// Collaborators shared by every group task
#[derive(Clone)]
pub struct FlushContext {
    pub cache: Arc<dyn IssueCache>,
    pub lookup: Arc<dyn IssueLookup>,
    pub config: BatchConfig,
}

/// What one group's processing did, folded into the coordinator metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub lookups: u64,
    pub lookup_failures: u64,
    pub not_found: u64,
    pub delivered: u64,
}

/// Message delivered to requests stranded by a panic in group processing
pub const GROUP_PANIC_MESSAGE: &str = "Lookup task panicked";

/// Process `group`, failing whatever is left undelivered if processing panics
pub async fn run_group(ctx: FlushContext, cycle: Uuid, mut group: AccountBatchGroup) -> GroupReport {
    let debug = ctx.config.debug;
    let outcome = AssertUnwindSafe(process_group(ctx, cycle, &mut group)).catch_unwind().await;
    match outcome {
        Ok(report) => report,
        Err(_) => {
            batch_warn!(debug, %cycle, identity = %group.identity, "run_group: processing panicked");
            let err = LookupError::transport(GROUP_PANIC_MESSAGE);
            let keys: Vec<String> = group.requests.keys().cloned().collect();
            let mut report = GroupReport::default();
            for key in keys {
                report.delivered += deliver(&mut group, &key, Err(err.clone()));
            }
            report
        }
    }
}

/// Resolve every request in `group`
///
/// Cached keys are answered without a lookup; the rest go out in chunks,
/// one lookup per chunk, in order. A failed chunk only affects its own keys.
pub async fn process_group(ctx: FlushContext, cycle: Uuid, group: &mut AccountBatchGroup) -> GroupReport {
    let debug = ctx.config.debug;
    let mut report = GroupReport::default();
    batch_debug!(
        debug,
        %cycle,
        identity = %group.identity,
        keys = group.keys.len(),
        requests = group.request_count(),
        "process_group: called"
    );

    let mut uncached = Vec::new();
    for key in std::mem::take(&mut group.keys) {
        match ctx.cache.get(&key).await {
            Some(entry) => {
                batch_debug!(debug, %cycle, %key, error = entry.is_error(), "process_group: cache hit");
                report.cache_hits += 1;
                report.delivered += deliver(group, &key, entry.data);
            }
            None => {
                report.cache_misses += 1;
                uncached.push(key);
            }
        }
    }

    if uncached.is_empty() {
        batch_debug!(debug, %cycle, identity = %group.identity, "process_group: all keys cached");
        return report;
    }

    let chunks = chunk_keys(&uncached, ctx.config.max_batch_size, ctx.config.max_query_length);
    batch_debug!(
        debug,
        %cycle,
        identity = %group.identity,
        uncached = uncached.len(),
        chunks = chunks.len(),
        "process_group: dispatching chunks"
    );

    for chunk in chunks {
        fetch_chunk(&ctx, cycle, group, chunk, &mut report).await;
    }

    report
}

async fn fetch_chunk(
    ctx: &FlushContext,
    cycle: Uuid,
    group: &mut AccountBatchGroup,
    chunk: Vec<String>,
    report: &mut GroupReport,
) {
    let debug = ctx.config.debug;
    let query = KeyQuery::new(chunk);
    let options = SearchOptions {
        limit: query.len(),
        account: group.account.clone(),
    };
    report.lookups += 1;
    batch_debug!(debug, %cycle, %query, "fetch_chunk: searching");

    match ctx.lookup.search(&query, &options).await {
        Ok(results) => {
            batch_debug!(debug, %cycle, found = results.issues.len(), requested = query.len(), "fetch_chunk: search returned");

            for issue in &results.issues {
                ctx.cache.add(&issue.key, Ok(issue.clone())).await;
            }

            for key in query.keys() {
                let result = match find_issue(&results.issues, key) {
                    Some(issue) => Ok(issue.clone()),
                    None => {
                        report.not_found += 1;
                        let err = LookupError::not_found(key.as_str());
                        ctx.cache.add(key, Err(err.clone())).await;
                        Err(err)
                    }
                };
                report.delivered += deliver(group, key, result);
            }
        }
        Err(err) => {
            batch_warn!(debug, %cycle, %query, error = %err, "fetch_chunk: search failed");
            report.lookup_failures += 1;
            for key in query.keys() {
                ctx.cache.add(key, Err(err.clone())).await;
                report.delivered += deliver(group, key, Err(err.clone()));
            }
        }
    }
}

fn find_issue<'a>(issues: &'a [Issue], key: &str) -> Option<&'a Issue> {
    issues.iter().find(|issue| issue.key == key)
}

/// Hand `result` to every caller waiting on `key`; returns how many were served
fn deliver(group: &mut AccountBatchGroup, key: &str, result: Result<Issue, LookupError>) -> u64 {
    let requests = group.take_requests(key);
    let count = requests.len() as u64;
    for request in requests {
        request.resolve(result.clone());
    }
    count
}
