//! Grouping of buffered requests by account

use std::collections::HashMap;

use crate::domain::Account;

use super::request::PendingRequest;

/// All requests of one flush cycle that share an account identity
#[derive(Debug)]
pub struct AccountBatchGroup {
    /// Grouping identity (account alias or the fallback identity)
    pub identity: String,

    /// Account of the first request seen for this identity
    pub account: Option<Account>,

    /// Distinct keys in first-seen order
    pub keys: Vec<String>,

    /// Every request, by key, in registration order
    pub requests: HashMap<String, Vec<PendingRequest>>,
}

impl AccountBatchGroup {
    fn new(identity: String, account: Option<Account>) -> Self {
        Self {
            identity,
            account,
            keys: Vec::new(),
            requests: HashMap::new(),
        }
    }

    fn push(&mut self, request: PendingRequest) {
        match self.requests.get_mut(request.key()) {
            Some(waiting) => waiting.push(request),
            None => {
                self.keys.push(request.key().to_string());
                self.requests.insert(request.key().to_string(), vec![request]);
            }
        }
    }

    /// Total number of callers waiting in this group
    pub fn request_count(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    /// Remove and return the callers waiting on `key`
    pub fn take_requests(&mut self, key: &str) -> Vec<PendingRequest> {
        self.requests.remove(key).unwrap_or_default()
    }
}

/// Split one cycle's requests into per-account groups
///
/// Groups come out in the order their identity was first seen; keys are
/// deduplicated per group while every request is kept.
pub fn group_requests(requests: Vec<PendingRequest>) -> Vec<AccountBatchGroup> {
    let mut groups: Vec<AccountBatchGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for request in requests {
        let identity = request.identity().to_string();
        let slot = match index.get(&identity) {
            Some(&slot) => slot,
            None => {
                groups.push(AccountBatchGroup::new(identity.clone(), request.account().cloned()));
                index.insert(identity, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].push(request);
    }

    groups
}
