//! Broadcast node: an eventually-consistent replicated set of integers,
//! converged by periodic anti-entropy gossip.

use murmur::{
    workload::broadcast::{BroadcastNode, GOSSIP_INTERVAL},
    Node,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), murmur::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let node = Node::new();
    let workload = BroadcastNode::register(node.clone());
    let anti_entropy = workload.spawn_anti_entropy(GOSSIP_INTERVAL);

    let result = node.run().await;
    anti_entropy.abort();
    result
}
