//! Error types for the node runtime and workloads.
//!
//! Per-message problems (an undecodable body, a failed send) surface as
//! [`Error`] values returned to the handler that hit them, where they are
//! logged and dropped. Only structural problems end the run loop: a failed
//! read on the input stream, or calling [`run`](crate::Node::run) twice.

use std::io;

use thiserror::Error;

/// Errors produced by the node runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// The input or output stream failed at the I/O level.
    #[error("stream i/o failed")]
    Io(#[from] io::Error),

    /// An outbound body or envelope could not be serialized.
    #[error("failed to encode outbound message")]
    Encode(#[source] serde_json::Error),

    /// An inbound body could not be deserialized into the shape its
    /// handler expects.
    #[error("failed to decode {kind:?} body")]
    Decode {
        /// The `type` of the message whose body failed to decode.
        kind: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// [`run`](crate::Node::run) was called more than once on the same node.
    #[error("node is already running or has already run")]
    AlreadyRunning,
}
