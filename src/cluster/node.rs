//! Cluster Node
//!
//! Identity and address of one cluster member.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use uuid::Uuid;

/// Current state of a node as seen by the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Up,
    Down,
    Unknown,
}

/// A cluster member. Equality and hashing use the node id only, so two
/// handles to the same member compare equal even if fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,

    /// Address the driver connects to
    pub connect_address: SocketAddr,

    pub datacenter: String,

    pub rack: String,
}

impl Node {
    pub fn new(connect_address: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            connect_address,
            datacenter: "dc1".to_string(),
            rack: "rack1".to_string(),
        }
    }

    pub fn with_location(mut self, datacenter: impl Into<String>, rack: impl Into<String>) -> Self {
        self.datacenter = datacenter.into();
        self.rack = rack.into();
        self
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.connect_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_identity() {
        let addr: SocketAddr = "127.0.0.1:9042".parse().unwrap();
        let a = Node::new(addr);
        let b = Node::new(addr);
        let a_again = a.clone().with_location("dc2", "rack9");

        assert_ne!(a, b);
        assert_eq!(a, a_again);
        assert_eq!(a.to_string(), "127.0.0.1:9042");
    }
}
