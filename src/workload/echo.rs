//! Echo workload: replies to every `echo` with an `echo_ok` carrying the
//! same payload.

use serde::{Deserialize, Serialize};

use crate::{
    node::Node,
    protocol::{Body, Envelope},
};

#[derive(Debug, Serialize, Deserialize)]
struct EchoBody {
    #[serde(flatten)]
    base: Body,
    echo: String,
}

/// Registers the echo handler.
pub fn register(node: &Node) {
    node.handle("echo", |node: Node, msg: Envelope| async move {
        let body: EchoBody = msg.decode()?;
        let reply = EchoBody {
            base: body.base.ack(),
            echo: body.echo,
        };
        node.send(msg.src, &reply).await
    });
}
