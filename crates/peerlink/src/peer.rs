//! The bridge: one [`Peer`] owns one connection's invocation state.
//!
//! Inbound bytes are reassembled into logical messages, decoded, and routed:
//! Invocations dispatch to the local runtime on their own task (the inbound
//! pump never blocks on another call's reply), Responses resolve the
//! correlation table. Outbound calls encode and hand one logical block to
//! the transport adapter.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::bytes::{Bytes, BytesMut};

use crate::codec::{CodecKind, WireCodec};
use crate::correlation::{CorrelationTable, InvokeError, ReplyHandle};
use crate::dispatch::{ActorRuntime, CallContext};
use crate::message::{ActorReference, CorrelationId, Message, ReplyOutcome};
use crate::reference::{ActorProxy, ReferenceResolver};
use crate::transport::{StreamTransport, Transport};

/// Connection-scoped bridge configuration.
#[derive(Debug, Clone, Default)]
pub struct PeerConfig {
    codec: CodecKind,
    call_timeout: Option<Duration>,
}

impl PeerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the wire codec. JSON by default.
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Fail pending invocations with `TimedOut` after `timeout` if no
    /// response arrived. Disabled by default.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

struct Shared {
    codec: Arc<dyn WireCodec>,
    transport: Arc<dyn Transport>,
    runtime: Arc<dyn ActorRuntime>,
    table: CorrelationTable,
    // Partial-frame buffer; the transport delivers fragments of one logical
    // message in order, so accumulation is a plain append.
    reassembly: StdMutex<BytesMut>,
    closed: AtomicBool,
    call_timeout: Option<Duration>,
}

/// Session-scoped bridge handle. Cloning shares the same connection state;
/// a Peer is never shared across connections.
#[derive(Clone)]
pub struct Peer {
    shared: Arc<Shared>,
}

impl Peer {
    /// Open a bridge over an already-established transport.
    pub fn open(
        transport: Arc<dyn Transport>,
        runtime: Arc<dyn ActorRuntime>,
        config: PeerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                codec: config.codec.build(),
                transport,
                runtime,
                table: CorrelationTable::new(),
                reassembly: StdMutex::new(BytesMut::new()),
                closed: AtomicBool::new(false),
                call_timeout: config.call_timeout,
            }),
        }
    }

    /// Open a bridge over a duplex byte stream, spawning framed read/write
    /// pumps. Must be called within a tokio runtime.
    pub fn open_stream<S>(stream: S, runtime: Arc<dyn ActorRuntime>, config: PeerConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (transport, mut inbound) = StreamTransport::spawn(stream);
        let peer = Self::open(Arc::new(transport), runtime, config);

        let pump = peer.clone();
        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                pump.on_message(&frame, true);
            }
            tracing::debug!("inbound stream ended, closing peer");
            pump.close();
        });

        peer
    }

    /// Resolve a reference into a callable proxy. No I/O, never fails.
    pub fn get_reference(&self, kind: &str, identity: &str) -> ActorProxy {
        ActorProxy::new(ActorReference::new(kind, identity), self.clone())
    }

    /// Feed one (possibly partial) transport frame.
    ///
    /// Fragments accumulate until a final frame completes the logical
    /// message; a decoding failure drops the frame with a diagnostic and
    /// leaves the connection open. Must be called within a tokio runtime.
    pub fn on_message(&self, frame: &[u8], is_final: bool) {
        let block = {
            let mut buffer = match self.shared.reassembly.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if buffer.is_empty() && is_final {
                Bytes::copy_from_slice(frame)
            } else {
                buffer.extend_from_slice(frame);
                if !is_final {
                    return;
                }
                buffer.split().freeze()
            }
        };

        match self.shared.codec.decode(&block) {
            Ok(message) => self.route(message),
            Err(e) => {
                tracing::warn!(error = %e, len = block.len(), "dropping undecodable frame");
            }
        }
    }

    fn route(&self, message: Message) {
        match message {
            Message::Invocation {
                correlation,
                target,
                method,
                args,
            } => {
                tracing::trace!(%correlation, %target, %method, "inbound invocation");
                let peer = self.clone();
                // Dispatch on its own task: the inbound pump must stay free
                // for reentrant invocations.
                tokio::spawn(async move {
                    let ctx = CallContext::new(
                        target,
                        Arc::new(peer.clone()) as Arc<dyn ReferenceResolver>,
                    );
                    let outcome = match peer.shared.runtime.invoke_local(ctx, &method, args).await {
                        Ok(value) => ReplyOutcome::Value(value),
                        Err(kind) => {
                            tracing::debug!(%correlation, failure = %kind, "local invocation failed");
                            ReplyOutcome::Failure(kind)
                        }
                    };
                    peer.send_response(correlation, outcome);
                });
            }
            Message::Response {
                correlation,
                outcome,
            } => match outcome {
                ReplyOutcome::Value(value) => {
                    self.shared.table.resolve(correlation, value);
                }
                ReplyOutcome::Failure(kind) => {
                    self.shared.table.fail(correlation, InvokeError::Remote(kind));
                }
            },
        }
    }

    /// Register a pending invocation and send it.
    ///
    /// Never blocks; send failures surface through the returned handle.
    pub(crate) fn invoke(
        &self,
        target: ActorReference,
        method: String,
        args: Vec<Value>,
    ) -> ReplyHandle {
        let (correlation, handle) = self.shared.table.register();

        if self.is_closed() {
            self.shared
                .table
                .fail(correlation, InvokeError::ConnectionClosed);
            return handle;
        }

        if let Some(timeout) = self.shared.call_timeout {
            let peer = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                // No-op if the call resolved in the meantime.
                if peer
                    .shared
                    .table
                    .fail(correlation, InvokeError::TimedOut(timeout))
                {
                    tracing::warn!(%correlation, ?timeout, "invocation timed out");
                }
            });
        }

        let message = Message::Invocation {
            correlation,
            target,
            method,
            args,
        };
        if let Err(e) = self.send(&message) {
            self.shared.table.fail(correlation, e);
        }
        handle
    }

    fn send(&self, message: &Message) -> Result<(), InvokeError> {
        if self.is_closed() {
            return Err(InvokeError::ConnectionClosed);
        }
        let block = self.shared.codec.encode(message)?;
        self.shared
            .transport
            .send_binary(block)
            .map_err(|e| InvokeError::Transport(e.to_string()))
    }

    fn send_response(&self, correlation: CorrelationId, outcome: ReplyOutcome) {
        let message = Message::Response {
            correlation,
            outcome,
        };
        if let Err(e) = self.send(&message) {
            tracing::error!(%correlation, error = %e, "failed to send response");
        }
    }

    /// Tear down the connection.
    ///
    /// Idempotent; fails every pending invocation with `ConnectionClosed`
    /// and makes further sends fail fast.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let failed = self.shared.table.fail_all(InvokeError::ConnectionClosed);
        if failed > 0 {
            tracing::debug!(failed, "closed peer with pending invocations");
        } else {
            tracing::debug!("closed peer");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of invocations awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.table.len()
    }
}

impl ReferenceResolver for Peer {
    fn get_reference(&self, kind: &str, identity: &str) -> ActorProxy {
        Peer::get_reference(self, kind, identity)
    }
}
