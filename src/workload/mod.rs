//! Workloads built on the node runtime.
//!
//! Each workload registers its handlers on a [`Node`](crate::Node) and owns
//! whatever state those handlers share. One binary per workload lives under
//! `src/bin/`.

pub mod broadcast;
pub mod echo;
pub mod unique;
