//! Policies Module
//!
//! Retry, load balancing and speculative execution contracts, the
//! implementations shipped with the crate, and name-based lookup used when
//! building an engine from configuration.

pub mod load_balancing;
pub mod retry;
pub mod speculative;

pub use load_balancing::{LoadBalancingPolicy, QueryPlan, RoundRobinPolicy, SortingLoadBalancingPolicy};
pub use retry::{DefaultRetryPolicy, FallthroughRetryPolicy, RetryDecision, RetryPolicy};
pub use speculative::{
    ConstantSpeculativeExecutionPolicy, NoSpeculativeExecutionPolicy, SpeculativeExecutionPolicy,
};

use crate::cluster::Topology;
use crate::config::SpeculativeExecutionConfig;
use crate::error::{DriverError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Accepts both short names and dotted, class-like names:
/// `com.example.SortingLoadBalancingPolicy` resolves like
/// `SortingLoadBalancingPolicy`.
fn short_name(name: &str) -> &str {
    name.trim().rsplit('.').next().unwrap_or(name)
}

pub fn retry_policy_from_name(name: &str) -> Result<Arc<dyn RetryPolicy>> {
    match short_name(name) {
        "DefaultRetryPolicy" => Ok(Arc::new(DefaultRetryPolicy::new())),
        "FallthroughRetryPolicy" => Ok(Arc::new(FallthroughRetryPolicy)),
        other => Err(DriverError::Config(format!("Unknown retry policy '{}'", other))),
    }
}

pub fn load_balancing_policy_from_name(
    name: &str,
    topology: Arc<dyn Topology>,
) -> Result<Arc<dyn LoadBalancingPolicy>> {
    match short_name(name) {
        "SortingLoadBalancingPolicy" => Ok(Arc::new(SortingLoadBalancingPolicy::new(topology))),
        "RoundRobinPolicy" => Ok(Arc::new(RoundRobinPolicy::new(topology))),
        other => Err(DriverError::Config(format!("Unknown load balancing policy '{}'", other))),
    }
}

pub fn speculative_policy_from_config(
    config: Option<&SpeculativeExecutionConfig>,
) -> Arc<dyn SpeculativeExecutionPolicy> {
    match config {
        Some(spec) => Arc::new(ConstantSpeculativeExecutionPolicy::new(
            spec.max_executions,
            Duration::from_millis(spec.delay_ms),
        )),
        None => Arc::new(NoSpeculativeExecutionPolicy),
    }
}
