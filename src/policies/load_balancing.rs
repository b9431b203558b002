//! Load Balancing Policies
//!
//! A load balancing policy turns the nodes the topology reports as up into
//! a query plan: the order in which coordinators are tried for one
//! statement.

use crate::cluster::{Node, Topology};
use crate::statement::Statement;
use itertools::Itertools;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lazy, finite sequence of candidate coordinators.
pub type QueryPlan = Box<dyn Iterator<Item = Arc<Node>> + Send>;

/// Load balancing policy contract.
pub trait LoadBalancingPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate coordinators for `statement`, most preferred first.
    fn new_query_plan(&self, statement: &Statement) -> QueryPlan;
}

/// Orders nodes by connect address, so every plan is the same. Meant for
/// tests that need to know which node is tried first.
pub struct SortingLoadBalancingPolicy {
    topology: Arc<dyn Topology>,
}

impl SortingLoadBalancingPolicy {
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        Self { topology }
    }
}

impl LoadBalancingPolicy for SortingLoadBalancingPolicy {
    fn name(&self) -> &'static str {
        "SortingLoadBalancingPolicy"
    }

    fn new_query_plan(&self, _statement: &Statement) -> QueryPlan {
        Box::new(
            self.topology
                .up_nodes()
                .into_iter()
                .sorted_by_key(|node| node.connect_address),
        )
    }
}

/// Rotates the first node of each plan across the up nodes.
pub struct RoundRobinPolicy {
    topology: Arc<dyn Topology>,
    index: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        Self::with_start_index(topology, rand::random::<u16>() as usize)
    }

    pub fn with_start_index(topology: Arc<dyn Topology>, start: usize) -> Self {
        Self {
            topology,
            index: AtomicUsize::new(start),
        }
    }
}

impl LoadBalancingPolicy for RoundRobinPolicy {
    fn name(&self) -> &'static str {
        "RoundRobinPolicy"
    }

    fn new_query_plan(&self, _statement: &Statement) -> QueryPlan {
        let nodes = self.topology.up_nodes();
        if nodes.is_empty() {
            return Box::new(std::iter::empty());
        }
        let len = nodes.len();
        let start = self.index.fetch_add(1, Ordering::Relaxed) % len;
        Box::new((0..len).map(move |offset| Arc::clone(&nodes[(start + offset) % len])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{NodeState, StaticTopology};

    fn topology() -> Arc<StaticTopology> {
        // registered out of address order on purpose
        Arc::new(StaticTopology::from_nodes(vec![
            Node::new("127.0.0.3:9042".parse().unwrap()),
            Node::new("127.0.0.1:9042".parse().unwrap()),
            Node::new("127.0.0.2:9042".parse().unwrap()),
        ]))
    }

    fn addresses(plan: QueryPlan) -> Vec<String> {
        plan.map(|node| node.connect_address.to_string()).collect()
    }

    #[test]
    fn test_sorting_plan_is_ordered_by_address() {
        let policy = SortingLoadBalancingPolicy::new(topology());
        let statement = Statement::new("select * from foo");
        let expected = vec!["127.0.0.1:9042", "127.0.0.2:9042", "127.0.0.3:9042"];
        assert_eq!(addresses(policy.new_query_plan(&statement)), expected);
        assert_eq!(addresses(policy.new_query_plan(&statement)), expected);
    }

    #[test]
    fn test_plans_skip_down_nodes() {
        let topology = topology();
        let down = topology.nodes()[1].clone();
        topology.set_state(&down.id, NodeState::Down);

        let policy = SortingLoadBalancingPolicy::new(topology);
        let plan: Vec<_> = policy.new_query_plan(&Statement::new("q")).collect();
        assert_eq!(plan.len(), 2);
        assert!(!plan.contains(&down));
    }

    #[test]
    fn test_round_robin_rotates_first_node() {
        let topology = topology();
        let nodes = topology.nodes();
        let policy = RoundRobinPolicy::with_start_index(topology, 0);
        let statement = Statement::new("q");

        let first: Vec<_> = policy.new_query_plan(&statement).collect();
        let second: Vec<_> = policy.new_query_plan(&statement).collect();
        assert_eq!(first, vec![nodes[0].clone(), nodes[1].clone(), nodes[2].clone()]);
        assert_eq!(second, vec![nodes[1].clone(), nodes[2].clone(), nodes[0].clone()]);
    }

    #[test]
    fn test_empty_topology_gives_empty_plan() {
        let policy = RoundRobinPolicy::new(Arc::new(StaticTopology::new()));
        assert_eq!(policy.new_query_plan(&Statement::new("q")).count(), 0);
    }
}
