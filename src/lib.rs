//! A node runtime for message-passing clusters, with a gossip broadcast
//! workload built on top.
//!
//! A [`Node`] reads newline-delimited JSON envelopes from its input stream,
//! dispatches each one by its body's `type` field to a registered handler,
//! and writes outbound envelopes as single lines on its output stream.
//! Handlers run concurrently, each on its own tokio task; the runtime
//! serializes nothing beyond the output stream itself.
//!
//! The [`workload`] module provides three workloads over this runtime:
//! an echo service, a deterministic unique-id service, and an
//! eventually-consistent broadcast service converged by push-based
//! anti-entropy gossip along a fixed neighbor topology.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![deny(unused_must_use)]

pub mod error;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod workload;

pub use error::Error;
pub use node::Node;
pub use protocol::{Body, Envelope};
