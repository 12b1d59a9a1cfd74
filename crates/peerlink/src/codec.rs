//! Pluggable wire codecs.
//!
//! A codec converts [`Message`] values to and from byte payloads. Codecs are
//! interchangeable and selected by configuration ([`CodecKind`]); the bridge
//! never assumes a particular encoding. Two implementations ship: a
//! human-readable JSON form and a compact MessagePack form.

use std::sync::Arc;

use tokio_util::bytes::Bytes;

use crate::message::Message;

/// Serialization failures.
///
/// A malformed inbound frame is dropped with a diagnostic; it never
/// terminates the connection or mutates caller state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(String),
    #[error("malformed frame: {0}")]
    Decode(String),
}

/// Converts typed messages to and from byte payloads.
pub trait WireCodec: Send + Sync {
    fn encode(&self, message: &Message) -> Result<Bytes, CodecError>;
    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError>;
}

/// Human-readable JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Bytes, CodecError> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError> {
        serde_json::from_slice(payload).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Compact MessagePack codec.
///
/// Encodes with field names so the tagged message schema survives the trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl WireCodec for MsgpackCodec {
    fn encode(&self, message: &Message) -> Result<Bytes, CodecError> {
        rmp_serde::to_vec_named(message)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError> {
        rmp_serde::from_slice(payload).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Codec selection, decided by configuration rather than by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecKind {
    #[default]
    Json,
    Msgpack,
}

impl CodecKind {
    pub fn build(self) -> Arc<dyn WireCodec> {
        match self {
            Self::Json => Arc::new(JsonCodec),
            Self::Msgpack => Arc::new(MsgpackCodec),
        }
    }
}
