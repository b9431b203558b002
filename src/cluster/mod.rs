//! Cluster Module
//!
//! Node identities and the topology view policies read from.

pub mod node;
pub mod topology;

pub use node::{Node, NodeState};
pub use topology::{StaticTopology, Topology};
