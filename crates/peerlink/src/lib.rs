//! peerlink: actor-invocation bridge over duplex byte transports.
//!
//! A [`Peer`] owns one connection: it turns local proxy calls into wire
//! messages, correlates asynchronous replies with the call that produced
//! them, and applies inbound invocations against a local runtime. The bridge
//! only needs "send a block of bytes" / "bytes arrived" from its transport,
//! so it works over any duplex byte channel.

pub mod codec;
pub mod correlation;
pub mod dispatch;
pub mod message;
pub mod peer;
pub mod reference;
pub mod transport;

pub use codec::{CodecError, CodecKind, JsonCodec, MsgpackCodec, WireCodec};
pub use correlation::{CorrelationTable, InvokeError, ReplyHandle};
pub use dispatch::{ActorRuntime, CallContext, DispatchTable};
pub use message::{ActorReference, CorrelationId, FailureKind, Message, ReplyOutcome};
pub use peer::{Peer, PeerConfig};
pub use reference::{ActorProxy, ReferenceResolver};
pub use transport::{StreamTransport, Transport};
