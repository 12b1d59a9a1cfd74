//! Correlation of in-flight invocations with their eventual responses.
//!
//! The table is the only bridge structure mutated from more than one task:
//! proxies register entries while the inbound pump resolves them. Ids come
//! from an atomic counter; entries live in a concurrent map and leave it
//! through exactly one resolution event (response, failure, timeout, or
//! teardown).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::codec::CodecError;
use crate::message::{CorrelationId, FailureKind};

/// Caller-facing invocation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    /// The remote side replied with a failure kind.
    #[error("remote failure: {0}")]
    Remote(FailureKind),
    /// No response arrived within the configured window.
    #[error("no response within {0:?}")]
    TimedOut(Duration),
    /// The connection tore down before a response arrived, or the send was
    /// attempted after teardown.
    #[error("connection closed")]
    ConnectionClosed,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("transport error: {0}")]
    Transport(String),
}

type Completion = oneshot::Sender<Result<Value, InvokeError>>;

struct Pending {
    created_at: Instant,
    completion: Completion,
}

/// Single-assignment result container observed by exactly one waiter.
///
/// Abandoning the handle does not remove the table entry; resolution,
/// timeout, or teardown does.
#[derive(Debug)]
pub struct ReplyHandle {
    correlation: CorrelationId,
    rx: oneshot::Receiver<Result<Value, InvokeError>>,
}

impl ReplyHandle {
    pub fn correlation(&self) -> CorrelationId {
        self.correlation
    }

    /// Wait for the reply.
    pub async fn recv(self) -> Result<Value, InvokeError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // The sender only disappears without a resolution event if the
            // peer was dropped wholesale; treat that as teardown.
            Err(_) => Err(InvokeError::ConnectionClosed),
        }
    }
}

/// Tracks outstanding calls awaiting a reply.
pub struct CorrelationTable {
    next_id: AtomicU64,
    pending: DashMap<CorrelationId, Pending>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
        }
    }

    /// Allocate a fresh, previously unused id and its completion slot.
    pub fn register(&self) -> (CorrelationId, ReplyHandle) {
        let id = CorrelationId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            Pending {
                created_at: Instant::now(),
                completion: tx,
            },
        );
        (
            id,
            ReplyHandle {
                correlation: id,
                rx,
            },
        )
    }

    /// Deliver a successful result.
    ///
    /// Returns `false` for unknown or already-resolved ids; duplicate and
    /// stray responses are expected hazards on a shared connection and are
    /// reported as a diagnostic only.
    pub fn resolve(&self, id: CorrelationId, value: Value) -> bool {
        self.complete(id, Ok(value))
    }

    /// Deliver a failure.
    pub fn fail(&self, id: CorrelationId, error: InvokeError) -> bool {
        self.complete(id, Err(error))
    }

    fn complete(&self, id: CorrelationId, outcome: Result<Value, InvokeError>) -> bool {
        match self.pending.remove(&id) {
            Some((_, entry)) => {
                tracing::trace!(
                    correlation = %id,
                    elapsed = ?entry.created_at.elapsed(),
                    "resolving pending invocation"
                );
                if entry.completion.send(outcome).is_err() {
                    // Waiter abandoned its handle; the entry is gone either way.
                    tracing::trace!(correlation = %id, "reply handle was abandoned");
                }
                true
            }
            None => {
                tracing::warn!(
                    correlation = %id,
                    "response for unknown or already-resolved correlation id, discarding"
                );
                false
            }
        }
    }

    /// Fail every outstanding invocation. Used on teardown.
    pub fn fail_all(&self, error: InvokeError) -> usize {
        // Collect first: removing while iterating would hold a shard lock.
        let ids: Vec<CorrelationId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, entry)) = self.pending.remove(&id) {
                let _ = entry.completion.send(Err(error.clone()));
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
