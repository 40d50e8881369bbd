//! The node runtime: message dispatch, replies, and local triggers.
//!
//! A [`Node`] is a cheaply cloneable handle to one process in the cluster.
//! [`Node::run`] drives it: a dedicated reader task pumps input lines into a
//! bounded queue, and the dispatch loop decodes each line and spawns the
//! handler registered for its type onto its own tokio task. Handlers run
//! concurrently with each other and with the reader; the only serialization
//! the runtime provides is the lock around the output stream, so one
//! [`Node::send`] always produces one whole line.

use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex as StdMutex, RwLock},
};

use futures::FutureExt;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::{mpsc, Mutex},
    task::JoinSet,
};
use tracing::{error, warn};

use crate::{
    error::Error,
    protocol::{Body, Envelope},
    registry::{Handler, HandlerRegistry},
};

/// Inbound lines buffered ahead of dispatch; once full, the reader blocks.
const INBOUND_BUFFER: usize = 100;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Identity assigned by `init`, set exactly once.
#[derive(Clone, Debug)]
struct Identity {
    node_id: String,
    node_ids: Vec<String>,
}

/// A handle to one node in the cluster.
///
/// All clones share the same identity, handler registry, and streams.
/// Handlers receive a clone so they can reply and trigger further work.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    identity: OnceCell<Identity>,
    handlers: RwLock<HandlerRegistry>,
    input: StdMutex<Option<BoxedReader>>,
    output: Mutex<BoxedWriter>,
}

impl Node {
    /// Creates a node wired to stdin and stdout.
    pub fn new() -> Self {
        Node::with_io(io::stdin(), io::stdout())
    }

    /// Creates a node over arbitrary async streams.
    ///
    /// Diagnostics never touch `output`; it carries protocol lines only.
    pub fn with_io(
        input: impl AsyncRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let node = Node {
            inner: Arc::new(NodeInner {
                identity: OnceCell::new(),
                handlers: RwLock::new(HandlerRegistry::new()),
                input: StdMutex::new(Some(Box::new(input))),
                output: Mutex::new(Box::new(output)),
            }),
        };
        node.handle("init", handle_init);
        node
    }

    /// This node's id, once `init` has assigned one.
    pub fn id(&self) -> Option<&str> {
        self.inner
            .identity
            .get()
            .map(|identity| identity.node_id.as_str())
    }

    /// Every node id in the cluster, once `init` has run.
    pub fn node_ids(&self) -> Option<&[String]> {
        self.inner
            .identity
            .get()
            .map(|identity| identity.node_ids.as_slice())
    }

    /// Registers `handler` for inbound messages of the given type.
    ///
    /// # Panics
    ///
    /// Panics if a handler is already registered for `kind`. Registering
    /// the same type twice is a programming error and aborts startup
    /// rather than silently overwriting.
    pub fn handle(&self, kind: impl Into<Cow<'static, str>>, handler: impl Handler) {
        let kind = kind.into();
        let mut handlers = self.inner.handlers.write().unwrap();
        if !handlers.insert(kind.clone(), handler) {
            panic!("handler already registered for message type {kind:?}");
        }
    }

    /// Runs the node until the input stream is exhausted.
    ///
    /// Lines are dispatched in arrival order, but handler completion order
    /// is unspecified since every invocation runs on its own task. An
    /// undecodable line or an unregistered type is logged and dropped;
    /// dispatch continues. Returns once end-of-input has been observed and
    /// every in-flight handler has completed. Only a read failure on the
    /// input stream (or a second call to `run`) produces an error.
    pub async fn run(&self) -> Result<(), Error> {
        let input = self
            .inner
            .input
            .lock()
            .unwrap()
            .take()
            .ok_or(Error::AlreadyRunning)?;

        let (queue, mut inbound) = mpsc::channel::<String>(INBOUND_BUFFER);
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(input).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if queue.send(line).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => return Ok(()),
                    Err(err) => return Err(Error::Io(err)),
                }
            }
        });

        let mut in_flight = JoinSet::new();
        while let Some(line) = inbound.recv().await {
            if line.trim().is_empty() {
                continue;
            }
            let msg: Envelope = match serde_json::from_str(&line) {
                Ok(msg) => msg,
                Err(err) => {
                    error!(%err, "dropping undecodable envelope");
                    continue;
                }
            };
            let Some(kind) = msg.kind().map(str::to_owned) else {
                error!(src = %msg.src, "dropping body without a type");
                continue;
            };
            let handler = self.inner.handlers.read().unwrap().get(&kind);
            let Some(handler) = handler else {
                warn!(kind = %kind, "no handler for message type");
                continue;
            };

            let node = self.clone();
            in_flight.spawn(async move {
                if let Err(err) = handler.handle(node, msg).await {
                    error!(%err, kind = %kind, "handler failed");
                }
            });

            // reap already-finished handlers so the set stays small
            while let Some(Some(joined)) = in_flight.join_next().now_or_never() {
                if let Err(err) = joined {
                    error!(%err, "handler task panicked");
                }
            }
        }

        // end of input: drain every in-flight handler before returning
        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = joined {
                error!(%err, "handler task panicked");
            }
        }

        reader
            .await
            .map_err(|err| Error::Io(io::Error::other(err)))?
    }

    /// Sends `body` to `dest`, addressed from this node's own id.
    ///
    /// The envelope is written as exactly one line under the output lock,
    /// so concurrent handlers never interleave partial lines. Failures are
    /// returned to the caller; a failed send never brings the node down.
    pub async fn send<B: Serialize>(&self, dest: impl Into<String>, body: &B) -> Result<(), Error> {
        let msg = Envelope {
            src: self.id().unwrap_or_default().to_owned(),
            dest: dest.into(),
            body: serde_json::to_value(body).map_err(Error::Encode)?,
        };
        let mut line = serde_json::to_string(&msg).map_err(Error::Encode)?;
        line.push('\n');

        let mut output = self.inner.output.lock().await;
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }

    /// Invokes the handler registered for `kind` on the caller's own task,
    /// with a synthesized envelope originating from this node itself.
    ///
    /// This is how internally scheduled events re-enter the dispatch path
    /// without touching the transport. A no-op when no handler is
    /// registered, so optional events can be fired unconditionally.
    pub async fn trigger<B: Serialize>(&self, kind: &str, body: &B) -> Result<(), Error> {
        let handler = self.inner.handlers.read().unwrap().get(kind);
        let Some(handler) = handler else {
            return Ok(());
        };
        let msg = Envelope {
            src: self.id().unwrap_or_default().to_owned(),
            dest: String::new(),
            body: serde_json::to_value(body).map_err(Error::Encode)?,
        };
        handler.handle(self.clone(), msg).await
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// Built-in handler for `init`: stores the assigned identity exactly once
/// and acknowledges with `init_ok`.
async fn handle_init(node: Node, msg: Envelope) -> Result<(), Error> {
    let body: Body = msg.decode()?;
    let identity = Identity {
        node_id: body.node_id.clone().unwrap_or_default(),
        node_ids: body.node_ids.clone().unwrap_or_default(),
    };
    if node.inner.identity.set(identity).is_err() {
        warn!("ignoring repeated init");
    }
    node.send(msg.src, &body.ack()).await
}
