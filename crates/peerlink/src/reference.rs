//! Callable proxies for remote actor references.

use serde_json::Value;

use crate::correlation::ReplyHandle;
use crate::message::ActorReference;
use crate::peer::Peer;

/// Turns a `(kind, identity)` pair into a callable stub.
///
/// Implemented by [`Peer`]; handed to the local runtime so hosted actors can
/// issue remote calls themselves.
pub trait ReferenceResolver: Send + Sync {
    fn get_reference(&self, kind: &str, identity: &str) -> ActorProxy;
}

/// Callable stub for a remote actor.
///
/// Construction performs no I/O and never fails; only invocation can fail.
/// Cheap to clone; every proxy for the same reference is equivalent and
/// stateless with respect to the others.
#[derive(Clone)]
pub struct ActorProxy {
    reference: ActorReference,
    peer: Peer,
}

impl ActorProxy {
    pub(crate) fn new(reference: ActorReference, peer: Peer) -> Self {
        Self { reference, peer }
    }

    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    /// Invoke `method` with `args` on the remote actor.
    ///
    /// Registers a pending invocation, sends the encoded message, and
    /// returns immediately. The handle resolves when the matching Response
    /// arrives, the call times out, or the connection tears down.
    pub fn call(&self, method: impl Into<String>, args: Vec<Value>) -> ReplyHandle {
        self.peer.invoke(self.reference.clone(), method.into(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchTable;
    use crate::peer::{Peer, PeerConfig};
    use crate::transport::testing::CaptureTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn proxy_construction_performs_no_io() {
        let transport = Arc::new(CaptureTransport::new());
        let peer = Peer::open(
            Arc::clone(&transport) as Arc<dyn crate::transport::Transport>,
            Arc::new(DispatchTable::new()),
            PeerConfig::new(),
        );

        let proxy = peer.get_reference("Hello", "0");
        let again = proxy.clone();
        assert_eq!(proxy.reference(), again.reference());
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(peer.pending_calls(), 0);
    }

    #[tokio::test]
    async fn equivalent_proxies_share_no_state() {
        let peer = Peer::open(
            Arc::new(CaptureTransport::new()),
            Arc::new(DispatchTable::new()),
            PeerConfig::new(),
        );

        let a = peer.get_reference("Hello", "0");
        let b = peer.get_reference("Hello", "0");
        assert_eq!(a.reference(), b.reference());

        let handle_a = a.call("hello", vec![]);
        let handle_b = b.call("hello", vec![]);
        assert_ne!(handle_a.correlation(), handle_b.correlation());
    }
}
