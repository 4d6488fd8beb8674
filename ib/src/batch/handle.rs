//! BatchHandle - client interface to the coordinator task

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};

use super::messages::{BatchMetrics, BatchRequest};
use super::request::{PendingRequest, RequestOptions};
use crate::domain::{Account, Issue};
use crate::error::LookupError;

/// Cloneable handle for registering lookups with a running coordinator
///
/// Registration never blocks and never fails; problems reach the caller
/// through the request's own error path.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    tx: mpsc::UnboundedSender<BatchRequest>,
}

impl BatchHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<BatchRequest>) -> Self {
        Self { tx }
    }

    /// Buffer a lookup of `key`; the outcome goes to the options' responder
    pub fn register_issue(&self, key: impl Into<String>, options: RequestOptions) {
        let request = PendingRequest::new(key, options);
        if request.key().is_empty() {
            request.resolve(Err(LookupError::InvalidKey { key: String::new() }));
            return;
        }

        if let Err(mpsc::error::SendError(req)) = self.tx.send(BatchRequest::Register(request)) {
            if let BatchRequest::Register(request) = req {
                request.resolve(Err(LookupError::Closed));
            }
        }
    }

    /// Register `key` and wait for its outcome
    pub async fn resolve(&self, key: impl Into<String>, account: Option<Account>) -> Result<Issue, LookupError> {
        let (tx, rx) = oneshot::channel();
        self.register_issue(key, RequestOptions::channel(tx).with_account(account));
        rx.await.unwrap_or(Err(LookupError::Cancelled))
    }

    /// Drop every buffered request without delivering it
    pub fn cancel(&self) {
        let _ = self.tx.send(BatchRequest::Cancel);
    }

    pub async fn metrics(&self) -> Result<BatchMetrics> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BatchRequest::GetMetrics { reply_tx })
            .map_err(|_| eyre!("Batch coordinator channel closed"))?;
        reply_rx.await.map_err(|_| eyre!("Batch coordinator dropped metrics reply"))
    }

    /// Ask the coordinator to flush and stop
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(BatchRequest::Shutdown)
            .map_err(|_| eyre!("Batch coordinator channel closed"))?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
