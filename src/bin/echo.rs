//! Echo node: replies to every `echo` with an identical `echo_ok`.

use murmur::{workload::echo, Node};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), murmur::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let node = Node::new();
    echo::register(&node);
    node.run().await
}
