//! Local dispatch of inbound invocations.
//!
//! [`ActorRuntime`] is the seam between the bridge and whatever hosts actor
//! instances locally. [`DispatchTable`] is the provided implementation: an
//! explicit table keyed by `(kind, method)` mapping to async handler
//! functions, built at configuration time with no runtime reflection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::message::{ActorReference, FailureKind};
use crate::reference::{ActorProxy, ReferenceResolver};

/// Per-invocation context handed to the local runtime.
///
/// Carries the target reference and a resolver so hosted actors can issue
/// remote calls of their own over the same connection.
#[derive(Clone)]
pub struct CallContext {
    target: ActorReference,
    resolver: Arc<dyn ReferenceResolver>,
}

impl CallContext {
    pub(crate) fn new(target: ActorReference, resolver: Arc<dyn ReferenceResolver>) -> Self {
        Self { target, resolver }
    }

    pub fn target(&self) -> &ActorReference {
        &self.target
    }

    pub fn identity(&self) -> &str {
        &self.target.identity
    }

    /// Resolve a reference into a proxy over the same connection.
    pub fn get_reference(&self, kind: &str, identity: &str) -> ActorProxy {
        self.resolver.get_reference(kind, identity)
    }
}

/// Applies an inbound Invocation against a locally hosted actor.
#[async_trait]
pub trait ActorRuntime: Send + Sync {
    async fn invoke_local(
        &self,
        ctx: CallContext,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, FailureKind>;
}

type Handler =
    Arc<dyn Fn(CallContext, Vec<Value>) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Explicit dispatch table: `(kind, method)` to handler function.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<(String, String), Handler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` on interface `kind`.
    ///
    /// Handler errors surface to the remote caller as application failures.
    pub fn register<F, Fut>(
        mut self,
        kind: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(CallContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let erased: Handler = Arc::new(move |ctx, args| {
            let fut: BoxFuture<'static, Result<Value, String>> = Box::pin(handler(ctx, args));
            fut
        });
        self.handlers.insert((kind.into(), method.into()), erased);
        self
    }

    fn hosts_kind(&self, kind: &str) -> bool {
        self.handlers.keys().any(|(k, _)| k.as_str() == kind)
    }
}

#[async_trait]
impl ActorRuntime for DispatchTable {
    async fn invoke_local(
        &self,
        ctx: CallContext,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, FailureKind> {
        let key = (ctx.target().kind.clone(), method.to_string());
        match self.handlers.get(&key) {
            Some(handler) => handler(ctx, args)
                .await
                .map_err(|error| FailureKind::Application { error }),
            None if self.hosts_kind(&ctx.target().kind) => Err(FailureKind::UnknownMethod),
            None => Err(FailureKind::UnknownReference),
        }
    }
}
