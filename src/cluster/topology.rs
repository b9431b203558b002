//! Topology
//!
//! Read-only view of cluster membership consumed by load balancing
//! policies. The engine itself never queries it.

use crate::cluster::node::{Node, NodeState};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;
use uuid::Uuid;

/// Source of the nodes a query plan may use.
pub trait Topology: Send + Sync {
    /// Nodes currently considered up, in registration order.
    fn up_nodes(&self) -> Vec<Arc<Node>>;

    /// Look up a node by id, whatever its state.
    fn node(&self, id: &Uuid) -> Option<Arc<Node>>;
}

/// Topology with a fixed member list whose states can be flipped at runtime.
#[derive(Default)]
pub struct StaticTopology {
    members: RwLock<Vec<(Arc<Node>, NodeState)>>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let members = nodes
            .into_iter()
            .map(|node| (Arc::new(node), NodeState::Up))
            .collect();
        Self {
            members: RwLock::new(members),
        }
    }

    pub fn add_node(&self, node: Node) -> Arc<Node> {
        let node = Arc::new(node);
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Arc::clone(&node), NodeState::Up));
        node
    }

    /// All members, whatever their state
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(node, _)| Arc::clone(node))
            .collect()
    }

    pub fn state(&self, id: &Uuid) -> Option<NodeState> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(node, _)| node.id == *id)
            .map(|(_, state)| *state)
    }

    /// Change the state of a member. Returns false if the node is unknown.
    pub fn set_state(&self, id: &Uuid, state: NodeState) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        match members.iter_mut().find(|(node, _)| node.id == *id) {
            Some((node, current)) => {
                if *current != state {
                    info!("Node {} changed state {:?} -> {:?}", node, current, state);
                }
                *current = state;
                true
            }
            None => false,
        }
    }
}

impl Topology for StaticTopology {
    fn up_nodes(&self) -> Vec<Arc<Node>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, state)| *state == NodeState::Up)
            .map(|(node, _)| Arc::clone(node))
            .collect()
    }

    fn node(&self, id: &Uuid) -> Option<Arc<Node>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(node, _)| node.id == *id)
            .map(|(node, _)| Arc::clone(node))
    }
}
