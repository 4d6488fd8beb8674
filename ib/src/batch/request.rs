//! Pending requests and their result delivery

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::oneshot;

use crate::domain::{Account, Issue, group_identity};
use crate::error::LookupError;

type SuccessFn = Box<dyn FnOnce(Issue) + Send>;
type ErrorFn = Box<dyn FnOnce(LookupError) + Send>;

/// Where a request's outcome goes; consumed by delivery
enum Responder {
    Callbacks { on_success: SuccessFn, on_error: ErrorFn },
    Channel(oneshot::Sender<Result<Issue, LookupError>>),
}

impl Responder {
    fn deliver(self, result: Result<Issue, LookupError>) {
        match self {
            Responder::Callbacks { on_success, on_error } => {
                // A panicking callback must not take the coordinator with it
                let _ = catch_unwind(AssertUnwindSafe(move || match result {
                    Ok(issue) => on_success(issue),
                    Err(err) => on_error(err),
                }));
            }
            Responder::Channel(tx) => {
                let _ = tx.send(result);
            }
        }
    }
}

/// Caller-supplied options for one registration
pub struct RequestOptions {
    /// Account the lookup must run under
    pub account: Option<Account>,
    responder: Responder,
}

impl RequestOptions {
    /// Deliver the outcome to a pair of callbacks; exactly one of them runs
    pub fn new<S, E>(on_success: S, on_error: E) -> Self
    where
        S: FnOnce(Issue) + Send + 'static,
        E: FnOnce(LookupError) + Send + 'static,
    {
        Self {
            account: None,
            responder: Responder::Callbacks {
                on_success: Box::new(on_success),
                on_error: Box::new(on_error),
            },
        }
    }

    /// Deliver the outcome on a oneshot channel
    pub fn channel(tx: oneshot::Sender<Result<Issue, LookupError>>) -> Self {
        Self {
            account: None,
            responder: Responder::Channel(tx),
        }
    }

    pub fn with_account(mut self, account: impl Into<Option<Account>>) -> Self {
        self.account = account.into();
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let responder = match self.responder {
            Responder::Callbacks { .. } => "callbacks",
            Responder::Channel(_) => "channel",
        };
        f.debug_struct("RequestOptions")
            .field("account", &self.account)
            .field("responder", &responder)
            .finish()
    }
}

/// One caller's wish to resolve a key
#[derive(Debug)]
pub struct PendingRequest {
    key: String,
    options: RequestOptions,
}

impl PendingRequest {
    pub fn new(key: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            key: key.into(),
            options,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn account(&self) -> Option<&Account> {
        self.options.account.as_ref()
    }

    /// Grouping identity derived from the account
    pub fn identity(&self) -> &str {
        group_identity(self.account())
    }

    /// Hand the outcome to the caller, consuming the request
    pub fn resolve(self, result: Result<Issue, LookupError>) {
        self.options.responder.deliver(result);
    }
}
