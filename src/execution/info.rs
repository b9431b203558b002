//! Execution Info
//!
//! Frozen record of how one logical execution was carried out: the
//! coordinator that answered, the attempts made, the errors that were
//! retried, and the metadata of the final response.

use crate::cluster::Node;
use crate::error::{ErrorKind, NodeError};
use crate::statement::Statement;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Size reported when the transport did not measure the response
pub const UNKNOWN_SIZE: i64 = -1;

/// Outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    InFlight,
    Succeeded,
    /// Failed, and the retry policy chose to ignore the error
    Ignored,
    Failed(ErrorKind),
    /// Still in flight when the execution ended or was cancelled
    Cancelled,
}

/// One physical try of the statement against one node.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    /// Position in the execution, in start order across all executions
    pub index: usize,
    /// 0 for the initial execution, 1.. for speculative ones
    pub execution: usize,
    /// Retries already performed by this execution before this attempt
    pub retry_count: u32,
    pub node: Arc<Node>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Option<Duration>,
    pub outcome: AttemptOutcome,
}

/// Execution record handed to the caller, either with the result or inside
/// the terminal error. It is never modified once built.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionInfo {
    pub(crate) statement: Arc<Statement>,
    pub(crate) coordinator: Option<Arc<Node>>,
    pub(crate) successful_execution_index: Option<usize>,
    pub(crate) speculative_execution_count: usize,
    pub(crate) errors: Vec<(Arc<Node>, NodeError)>,
    pub(crate) warnings: Vec<String>,
    pub(crate) incoming_payload: HashMap<String, Vec<u8>>,
    pub(crate) paging_state: Option<Vec<u8>>,
    pub(crate) tracing_id: Option<Uuid>,
    pub(crate) response_size_in_bytes: i64,
    pub(crate) compressed_response_size_in_bytes: i64,
    pub(crate) schema_in_agreement: bool,
    pub(crate) attempts: Vec<Attempt>,
}

impl ExecutionInfo {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Node that produced the response or the terminal server error.
    /// `None` if no node ever answered the final attempt.
    pub fn coordinator(&self) -> Option<&Arc<Node>> {
        self.coordinator.as_ref()
    }

    /// Index of the attempt whose response was returned; `None` when the
    /// execution failed.
    pub fn successful_execution_index(&self) -> Option<usize> {
        self.successful_execution_index
    }

    pub fn speculative_execution_count(&self) -> usize {
        self.speculative_execution_count
    }

    /// Errors of the attempts that were retried, in attempt order. The
    /// error that ended a failed execution is not part of this list.
    pub fn errors(&self) -> &[(Arc<Node>, NodeError)] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn incoming_payload(&self) -> &HashMap<String, Vec<u8>> {
        &self.incoming_payload
    }

    pub fn paging_state(&self) -> Option<&[u8]> {
        self.paging_state.as_deref()
    }

    pub fn tracing_id(&self) -> Option<Uuid> {
        self.tracing_id
    }

    /// `UNKNOWN_SIZE` (-1) when the size was not measured
    pub fn response_size_in_bytes(&self) -> i64 {
        self.response_size_in_bytes
    }

    /// `UNKNOWN_SIZE` (-1) when the response was not compressed or the size
    /// was not measured
    pub fn compressed_response_size_in_bytes(&self) -> i64 {
        self.compressed_response_size_in_bytes
    }

    pub fn is_schema_in_agreement(&self) -> bool {
        self.schema_in_agreement
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Number of attempts actually sent
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Retried errors tallied by kind, for cross-node aggregation.
    pub fn error_counts(&self) -> HashMap<ErrorKind, usize> {
        let mut counts = HashMap::new();
        for (_, error) in &self.errors {
            *counts.entry(error.kind()).or_insert(0) += 1;
        }
        counts
    }
}
