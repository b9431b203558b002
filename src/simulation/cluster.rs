//! Simulated Cluster
//!
//! In-memory cluster that answers queries from primes. It is both the
//! topology the load balancing policies read and the transport the engine
//! sends attempts through.

use crate::cluster::{Node, NodeState, StaticTopology, Topology};
use crate::error::NodeError;
use crate::response::Response;
use crate::simulation::prime::{Prime, PrimedResult};
use crate::statement::{Consistency, Statement};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

pub const SIMULATED_PORT: u16 = 9042;

/// A query as received by a simulated node
#[derive(Debug, Clone, Serialize)]
pub struct LoggedQuery {
    pub query: String,
    pub consistency: Option<Consistency>,
    pub received_at: DateTime<Utc>,
}

pub struct SimulatedNode {
    node: Arc<Node>,
    primes: Mutex<Vec<Prime>>,
    log: Mutex<Vec<LoggedQuery>>,
    reachable: AtomicBool,
}

impl SimulatedNode {
    fn new(node: Arc<Node>) -> Self {
        Self {
            node,
            primes: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn address(&self) -> SocketAddr {
        self.node.connect_address
    }

    /// Add a prime. The most recent prime for a query wins.
    pub fn prime(&self, prime: Prime) {
        debug!("Priming {} for '{}': {:?}", self.node, prime.query, prime.result);
        self.primes.lock().unwrap_or_else(PoisonError::into_inner).push(prime);
    }

    pub fn query_log(&self) -> Vec<LoggedQuery> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear_log(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn clear_primes(&self) {
        self.primes.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn primed_for(&self, query: &str) -> Option<Prime> {
        self.primes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|prime| prime.query == query)
            .cloned()
    }

    async fn answer(&self, statement: &Statement) -> Result<Response, NodeError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(NodeError::ConnectionError(format!("{} refused the connection", self.node)));
        }

        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LoggedQuery {
                query: statement.query.clone(),
                consistency: statement.consistency,
                received_at: Utc::now(),
            });

        let Some(prime) = self.primed_for(&statement.query) else {
            return Ok(Response::empty());
        };
        if let Some(delay) = prime.delay {
            tokio::time::sleep(delay).await;
        }

        match prime.result {
            PrimedResult::Success(mut response) => {
                if response.size_in_bytes.is_none() {
                    response.size_in_bytes = serde_json::to_vec(&response.rows)
                        .ok()
                        .map(|bytes| bytes.len() as u64);
                }
                if statement.tracing && response.tracing_id.is_none() {
                    response.tracing_id = Some(Uuid::new_v4());
                }
                Ok(response)
            }
            PrimedResult::Error(error) => Err(error),
        }
    }
}

pub struct SimulatedCluster {
    topology: Arc<StaticTopology>,
    nodes: Vec<Arc<SimulatedNode>>,
}

impl SimulatedCluster {
    /// `size` nodes listening on 127.0.0.1..=127.0.0.<size>
    pub fn new(size: usize) -> Self {
        let topology = Arc::new(StaticTopology::new());
        let nodes = (0..size)
            .map(|i| {
                let ip = Ipv4Addr::from(u32::from(Ipv4Addr::LOCALHOST) + i as u32);
                let node = topology.add_node(Node::new(SocketAddr::new(IpAddr::V4(ip), SIMULATED_PORT)));
                Arc::new(SimulatedNode::new(node))
            })
            .collect();
        Self { topology, nodes }
    }

    pub fn node(&self, index: usize) -> Option<&Arc<SimulatedNode>> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Arc<SimulatedNode>] {
        &self.nodes
    }

    pub fn topology(&self) -> &Arc<StaticTopology> {
        &self.topology
    }

    pub fn clear_logs(&self) {
        self.nodes.iter().for_each(|node| node.clear_log());
    }

    pub fn clear_primes(&self) {
        self.nodes.iter().for_each(|node| node.clear_primes());
    }

    /// Make the node refuse connections. The topology still reports it up,
    /// as it would until the driver notices.
    pub fn stop_node(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            debug!("Stopping simulated node {}", node.node);
            node.reachable.store(false, Ordering::SeqCst);
        }
    }

    pub fn start_node(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            debug!("Starting simulated node {}", node.node);
            node.reachable.store(true, Ordering::SeqCst);
        }
    }

    /// Mark the node down in the topology, removing it from query plans.
    pub fn mark_down(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            self.topology.set_state(&node.node.id, NodeState::Down);
        }
    }

    pub fn mark_up(&self, index: usize) {
        if let Some(node) = self.nodes.get(index) {
            self.topology.set_state(&node.node.id, NodeState::Up);
        }
    }

    fn find(&self, id: &Uuid) -> Option<&Arc<SimulatedNode>> {
        self.nodes.iter().find(|node| node.node.id == *id)
    }
}

impl Topology for SimulatedCluster {
    fn up_nodes(&self) -> Vec<Arc<Node>> {
        self.topology.up_nodes()
    }

    fn node(&self, id: &Uuid) -> Option<Arc<Node>> {
        Topology::node(self.topology.as_ref(), id)
    }
}

#[async_trait]
impl Transport for SimulatedCluster {
    async fn send(&self, node: &Node, statement: &Statement) -> Result<Response, NodeError> {
        match self.find(&node.id) {
            Some(simulated) => simulated.answer(statement).await,
            None => Err(NodeError::ConnectionError(format!("{} is not part of the cluster", node))),
        }
    }
}
