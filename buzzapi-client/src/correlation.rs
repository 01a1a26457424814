//! Outstanding async requests, keyed by message id.
//!
//! Removing an entry and delivering its outcome are a single operation here:
//! there is no way to take an entry out of the table without sending exactly
//! one result through its channel.

use crate::envelope::Page;
use buzzapi_core::error::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Receives the outcome of one registered request.
pub(crate) type Completion = oneshot::Receiver<Result<Page>>;

#[derive(Debug)]
pub(crate) struct PendingRequest {
    tx: oneshot::Sender<Result<Page>>,
    created_at: Instant,
    resource: String,
    operation: String,
}

impl PendingRequest {
    pub(crate) fn new(resource: &str, operation: &str) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let pending = Self {
            tx,
            created_at: Instant::now(),
            resource: resource.to_string(),
            operation: operation.to_string(),
        };
        (pending, rx)
    }

    fn deliver(self, message_id: &str, outcome: Result<Page>) {
        if self.tx.send(outcome).is_err() {
            debug!(
                message_id,
                resource = %self.resource,
                operation = %self.operation,
                "Caller went away before its outcome arrived"
            );
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CorrelationTable {
    entries: HashMap<String, PendingRequest>,
}

impl CorrelationTable {
    /// Adds a request. A live entry under the same id is cancelled first, so
    /// no caller is ever left without an outcome.
    pub(crate) fn register(&mut self, message_id: String, pending: PendingRequest) {
        if let Some(previous) = self.entries.remove(&message_id) {
            warn!(message_id = %message_id, "Server reused an outstanding message id");
            previous.deliver(
                &message_id,
                Err(Error::cancelled(format!(
                    "message id {message_id} was reissued by the server"
                ))),
            );
        }
        self.entries.insert(message_id, pending);
    }

    /// Removes `message_id` and delivers `outcome` to it.
    ///
    /// Returns `false` if the id is not outstanding; the outcome is dropped.
    pub(crate) fn resolve(&mut self, message_id: &str, outcome: Result<Page>) -> bool {
        match self.entries.remove(message_id) {
            Some(pending) => {
                pending.deliver(message_id, outcome);
                true
            }
            None => false,
        }
    }

    /// Removes every entry, delivering the error built for each id.
    pub(crate) fn reject_all(&mut self, mut make_error: impl FnMut(&str) -> Error) -> usize {
        let count = self.entries.len();
        for (message_id, pending) in self.entries.drain() {
            let err = make_error(&message_id);
            pending.deliver(&message_id, Err(err));
        }
        count
    }

    /// Rejects every entry older than `timeout` with a timeout error.
    pub(crate) fn expire(&mut self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, p)| now.duration_since(p.created_at) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for message_id in &expired {
            if let Some(pending) = self.entries.remove(message_id) {
                warn!(
                    message_id = %message_id,
                    resource = %pending.resource,
                    operation = %pending.operation,
                    "Request timed out"
                );
                pending.deliver(message_id, Err(Error::timeout(message_id.clone())));
            }
        }
        expired
    }

    /// Ids of every outstanding request.
    pub(crate) fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
