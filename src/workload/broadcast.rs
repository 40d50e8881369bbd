//! Gossip broadcast workload.
//!
//! Maintains a grow-only set of broadcast values and converges it across
//! the cluster by push-based anti-entropy: on every tick a node sends each
//! neighbor the values that neighbor is not yet known to hold. A neighbor's
//! knowledge is advanced only by gossip received *from* it, never by sends
//! *to* it, so gossip doubles as the acknowledgement channel: until a value
//! comes back it keeps being re-pushed. Both sides of an exchange reduce to
//! idempotent set unions, which makes the protocol indifferent to
//! duplicated, reordered, or finitely lost deliveries.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{task::JoinHandle, time};
use tracing::{debug, error};

use crate::{
    error::Error,
    node::Node,
    protocol::{Body, Envelope},
};

/// How often un-acknowledged deltas are re-pushed to neighbors.
pub const GOSSIP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct BroadcastRequest {
    #[serde(flatten)]
    base: Body,
    message: i64,
}

#[derive(Debug, Serialize)]
struct ReadReply {
    #[serde(flatten)]
    base: Body,
    messages: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TopologyRequest {
    #[serde(flatten)]
    base: Body,
    topology: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GossipBody {
    #[serde(flatten)]
    base: Body,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    messages: Vec<i64>,
}

#[derive(Debug, Default)]
struct State {
    /// Every value this node has ingested, directly or via gossip.
    values: HashSet<i64>,
    /// Fan-out set, assigned by `topology`.
    neighbors: Vec<String>,
    /// Values each neighbor is known to hold. A lower bound on the truth:
    /// advanced only by gossip received from that neighbor.
    known: HashMap<String, HashSet<i64>>,
}

/// The values a neighbor is not yet known to hold. No record means nothing
/// is known, so the whole set goes out.
fn delta(values: &HashSet<i64>, known: Option<&HashSet<i64>>) -> Vec<i64> {
    match known {
        Some(known) => values.difference(known).copied().collect(),
        None => values.iter().copied().collect(),
    }
}

/// The broadcast workload: shared state plus the handlers that mutate it.
///
/// The state sits behind one mutex that is never held across an await;
/// handlers collect what they need under the lock and do their I/O after
/// releasing it.
#[derive(Clone, Debug)]
pub struct BroadcastNode {
    node: Node,
    state: Arc<Mutex<State>>,
}

impl BroadcastNode {
    /// Registers the `broadcast`, `read`, `topology`, and `gossip` handlers
    /// on the node and returns the workload handle.
    pub fn register(node: Node) -> Self {
        let workload = BroadcastNode {
            node: node.clone(),
            state: Arc::new(Mutex::new(State::default())),
        };

        let this = workload.clone();
        node.handle("broadcast", move |node: Node, msg: Envelope| {
            let this = this.clone();
            async move { this.handle_broadcast(node, msg).await }
        });

        let this = workload.clone();
        node.handle("read", move |node: Node, msg: Envelope| {
            let this = this.clone();
            async move { this.handle_read(node, msg).await }
        });

        let this = workload.clone();
        node.handle("topology", move |node: Node, msg: Envelope| {
            let this = this.clone();
            async move { this.handle_topology(node, msg).await }
        });

        let this = workload.clone();
        node.handle("gossip", move |node: Node, msg: Envelope| {
            let this = this.clone();
            async move { this.handle_gossip(node, msg).await }
        });

        workload
    }

    /// Spawns the anti-entropy timer: one fan-out round per `interval`.
    ///
    /// Runs until aborted; callers abort the returned handle once the
    /// node's run loop finishes.
    pub fn spawn_anti_entropy(&self, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            // interval fires immediately; a fresh node has nothing to push
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = this.gossip_once().await {
                    error!(%err, "anti-entropy round failed");
                }
            }
        })
    }

    /// One anti-entropy round: push every neighbor the values it is not yet
    /// known to hold.
    ///
    /// Send-only: `known` is left untouched, since nothing confirms
    /// delivery until the neighbor gossips the values back. A send failure
    /// to one neighbor is logged and does not stop the rest of the round.
    pub async fn gossip_once(&self) -> Result<(), Error> {
        let deltas: Vec<(String, Vec<i64>)> = {
            let state = self.state.lock().unwrap();
            state
                .neighbors
                .iter()
                .map(|neighbor| {
                    (
                        neighbor.clone(),
                        delta(&state.values, state.known.get(neighbor)),
                    )
                })
                .collect()
        };

        for (neighbor, messages) in deltas {
            let body = GossipBody {
                base: Body::new("gossip"),
                messages,
            };
            if let Err(err) = self.node.send(&neighbor, &body).await {
                error!(%err, %neighbor, "failed to push gossip");
            }
        }
        Ok(())
    }

    /// Ingests one broadcast value and acks with a payload-free
    /// `broadcast_ok`: the ack confirms receipt, not content.
    async fn handle_broadcast(&self, node: Node, msg: Envelope) -> Result<(), Error> {
        let body: BroadcastRequest = msg.decode()?;
        self.state.lock().unwrap().values.insert(body.message);
        node.send(msg.src, &body.base.ack()).await
    }

    /// Replies with the full value set, in no particular order.
    async fn handle_read(&self, node: Node, msg: Envelope) -> Result<(), Error> {
        let body: Body = msg.decode()?;
        let messages: Vec<i64> = {
            let state = self.state.lock().unwrap();
            state.values.iter().copied().collect()
        };
        let reply = ReadReply {
            base: body.ack(),
            messages,
        };
        node.send(msg.src, &reply).await
    }

    /// Stores this node's own neighbor entry, discards the rest of the
    /// cluster mapping, and acks. Last write wins on re-receipt.
    async fn handle_topology(&self, node: Node, msg: Envelope) -> Result<(), Error> {
        let mut body: TopologyRequest = msg.decode()?;
        let node_id = node.id().unwrap_or_default().to_owned();
        let neighbors = body.topology.remove(&node_id).unwrap_or_default();
        debug!(?neighbors, "topology assigned");
        self.state.lock().unwrap().neighbors = neighbors;
        node.send(msg.src, &body.base.ack()).await
    }

    /// The two entry points into the gossip exchange.
    ///
    /// A self-originated envelope is the tick event funneled through the
    /// dispatch table: it fans out and sends nothing back. Anything else is
    /// ingest from a peer: union the payload into the value set, record
    /// that the sender holds those values, and stay silent (gossip is
    /// fire-and-forget, not request/response).
    async fn handle_gossip(&self, node: Node, msg: Envelope) -> Result<(), Error> {
        let body: GossipBody = msg.decode()?;

        if node.id() == Some(msg.src.as_str()) {
            return self.gossip_once().await;
        }

        let mut state = self.state.lock().unwrap();
        let known = state.known.entry(msg.src).or_default();
        known.extend(body.messages.iter().copied());
        state.values.extend(body.messages);
        Ok(())
    }
}
