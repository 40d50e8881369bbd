//! Handler registry mapping message types to handlers.

use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use futures::{future::BoxFuture, Future, FutureExt};

use crate::{error::Error, node::Node, protocol::Envelope};

/// An object-safe message handler.
///
/// Implemented for every `Fn(Node, Envelope) -> impl Future<Output =
/// Result<(), Error>>` closure, so handlers are usually registered as async
/// closures capturing whatever state their workload owns.
pub trait Handler: Send + Sync + 'static {
    /// Handles one inbound envelope.
    fn handle(&self, node: Node, msg: Envelope) -> BoxFuture<'static, Result<(), Error>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Node, Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn handle(&self, node: Node, msg: Envelope) -> BoxFuture<'static, Result<(), Error>> {
        (self)(node, msg).boxed()
    }
}

/// A table of handlers keyed by message type.
///
/// Populated once before the node runs and read-only afterwards. Lookups
/// clone the handler's `Arc`, so an invocation never holds the table.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Cow<'static, str>, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        HandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Inserts a handler for a message type.
    ///
    /// Returns `false` if the type is already registered, leaving the
    /// existing handler in place.
    pub fn insert(&mut self, kind: impl Into<Cow<'static, str>>, handler: impl Handler) -> bool {
        let kind = kind.into();
        if self.handlers.contains_key(&kind) {
            return false;
        }

        self.handlers.insert(kind, Arc::new(handler));
        true
    }

    /// Looks up the handler for a message type.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(kind).cloned()
    }

    /// Returns `true` if a handler is registered for the given type.
    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// The number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_node: Node, _msg: Envelope) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn insert_refuses_duplicates() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.insert("echo", noop));
        assert!(!registry.insert("echo", noop));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_by_borrowed_key() {
        let mut registry = HandlerRegistry::new();
        registry.insert("gossip".to_owned(), noop);
        assert!(registry.contains("gossip"));
        assert!(registry.get("gossip").is_some());
        assert!(registry.get("broadcast").is_none());
    }
}
