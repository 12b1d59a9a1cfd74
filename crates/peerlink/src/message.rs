//! Wire message schema shared by every codec.
//!
//! A [`Message`] is the only unit crossing the wire: either an Invocation
//! (execute a named method on a target reference) or a Response (the result
//! or failure for a previously sent Invocation, matched by correlation id).

use serde::{Deserialize, Serialize};

/// Identifier linking an Invocation to its eventual Response.
///
/// Allocated monotonically by the sending peer; unique for the life of one
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque addressable handle to an actor instance.
///
/// Immutable, equality by value. Encodes on the wire as the `{kind,
/// identity}` pair, never as a proxy object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorReference {
    /// Interface kind the target implements.
    pub kind: String,
    /// Instance identity within that kind.
    pub identity: String,
}

impl ActorReference {
    pub fn new(kind: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identity: identity.into(),
        }
    }
}

impl std::fmt::Display for ActorReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.identity)
    }
}

/// Failure kinds that cross the wire in a Response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The target kind is not hosted by the receiving runtime.
    UnknownReference,
    /// The kind is hosted but has no such method.
    UnknownMethod,
    /// The hosted actor ran and failed.
    Application { error: String },
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownReference => write!(f, "unknown reference"),
            Self::UnknownMethod => write!(f, "unknown method"),
            Self::Application { error } => write!(f, "application error: {}", error),
        }
    }
}

/// Reply payload of a Response: a result value or a failure kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    Value(serde_json::Value),
    Failure(FailureKind),
}

/// The unit crossing the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Invocation {
        correlation: CorrelationId,
        target: ActorReference,
        method: String,
        args: Vec<serde_json::Value>,
    },
    Response {
        correlation: CorrelationId,
        outcome: ReplyOutcome,
    },
}

impl Message {
    pub fn correlation(&self) -> CorrelationId {
        match self {
            Self::Invocation { correlation, .. } => *correlation,
            Self::Response { correlation, .. } => *correlation,
        }
    }
}
