//! Unique-id workload.
//!
//! Ids are derived from the requester and its `msg_id`
//! (`"{src}-{msg_id}"`), so they are deterministic, unique as long as each
//! requester numbers its own requests uniquely, and need no coordination
//! between nodes.

use serde::{Deserialize, Serialize};

use crate::{
    node::Node,
    protocol::{Body, Envelope},
};

#[derive(Debug, Serialize, Deserialize)]
struct GenerateBody {
    #[serde(flatten)]
    base: Body,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

/// Registers the generate handler.
pub fn register(node: &Node) {
    node.handle("generate", |node: Node, msg: Envelope| async move {
        let body: GenerateBody = msg.decode()?;
        let id = format!("{}-{}", msg.src, body.base.msg_id.unwrap_or_default());
        let reply = GenerateBody {
            base: body.base.ack(),
            id: Some(id),
        };
        node.send(msg.src, &reply).await
    });
}
