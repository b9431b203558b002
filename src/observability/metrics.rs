//! Engine Metrics
//!
//! Per-node counters updated by the engine as attempts complete.

use crate::cluster::Node;
use crate::error::ErrorKind;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Counters for one node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub successes: u64,
    pub errors: HashMap<ErrorKind, u64>,
    pub retries: u64,
    pub ignores: u64,
    pub speculative_executions: u64,
    pub total_success_latency: Duration,
}

impl NodeMetrics {
    pub fn error_count(&self) -> u64 {
        self.errors.values().sum()
    }

    pub fn mean_success_latency(&self) -> Option<Duration> {
        if self.successes == 0 {
            return None;
        }
        u32::try_from(self.successes)
            .ok()
            .map(|count| self.total_success_latency / count)
    }
}

/// Metrics shared by every execution of one engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    nodes: DashMap<Uuid, NodeMetrics>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, node: &Node, latency: Duration) {
        let mut metrics = self.nodes.entry(node.id).or_default();
        metrics.successes += 1;
        metrics.total_success_latency += latency;
    }

    pub fn record_error(&self, node: &Node, kind: ErrorKind) {
        *self.nodes.entry(node.id).or_default().errors.entry(kind).or_insert(0) += 1;
    }

    pub fn record_retry(&self, node: &Node) {
        self.nodes.entry(node.id).or_default().retries += 1;
    }

    pub fn record_ignore(&self, node: &Node) {
        self.nodes.entry(node.id).or_default().ignores += 1;
    }

    pub fn record_speculative_execution(&self, node: &Node) {
        self.nodes.entry(node.id).or_default().speculative_executions += 1;
    }

    pub fn node(&self, id: &Uuid) -> Option<NodeMetrics> {
        self.nodes.get(id).map(|metrics| metrics.clone())
    }

    pub fn snapshot(&self) -> HashMap<Uuid, NodeMetrics> {
        self.nodes
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn reset(&self) {
        self.nodes.clear();
    }
}
