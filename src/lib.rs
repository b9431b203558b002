//! Coordinator execution engine
//!
//! Executes statements against a cluster: picks coordinators from a load
//! balancing policy, retries according to a retry policy, optionally runs
//! speculative executions, and returns an `ExecutionInfo` describing every
//! attempt, whether the execution succeeded or failed.

pub mod cluster;
pub mod config;
pub mod error;
pub mod execution;
pub mod observability;
pub mod policies;
pub mod response;
pub mod simulation;
pub mod statement;
pub mod transport;

pub use cluster::{Node, NodeState, StaticTopology, Topology};
pub use config::{DriverConfig, SpeculativeExecutionConfig};
pub use error::{DriverError, ErrorKind, NodeError, Result};
pub use execution::{CancelHandle, ExecutionInfo, RequestEngine, RequestEngineBuilder, UNKNOWN_SIZE};
pub use policies::{LoadBalancingPolicy, RetryDecision, RetryPolicy, SpeculativeExecutionPolicy};
pub use response::{ExecutionResult, Response};
pub use statement::{Consistency, Statement, WriteType};
pub use transport::Transport;
