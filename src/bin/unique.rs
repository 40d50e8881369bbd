//! Unique-id node: derives ids from the requester and its `msg_id`.

use murmur::{workload::unique, Node};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), murmur::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let node = Node::new();
    unique::register(&node);
    node.run().await
}
