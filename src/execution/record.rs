//! Execution Record
//!
//! Mutable accumulator behind `ExecutionInfo`. Only the engine writes to
//! it; callers only ever see frozen `ExecutionInfo` snapshots.
//!
//! Executions running concurrently (speculative executions) share one
//! record. Attempt indices are assigned under the lock when an attempt
//! starts, and retried errors are ordered by that index when the record is
//! frozen, so the order does not depend on which attempt finished first.

use crate::cluster::Node;
use crate::error::NodeError;
use crate::execution::info::{Attempt, AttemptOutcome, ExecutionInfo, UNKNOWN_SIZE};
use crate::response::Response;
use crate::statement::Statement;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub(crate) struct ExecutionRecord {
    statement: Arc<Statement>,
    attempts: Vec<Attempt>,
    errors: Vec<(usize, Arc<Node>, NodeError)>,
    speculative_execution_count: usize,
}

impl ExecutionRecord {
    pub fn new(statement: Arc<Statement>) -> Self {
        Self {
            statement,
            attempts: Vec::new(),
            errors: Vec::new(),
            speculative_execution_count: 0,
        }
    }

    /// Register a new in-flight attempt and return its index.
    pub fn begin_attempt(&mut self, node: &Arc<Node>, execution: usize, retry_count: u32) -> usize {
        let index = self.attempts.len();
        self.attempts.push(Attempt {
            index,
            execution,
            retry_count,
            node: Arc::clone(node),
            started_at: Utc::now(),
            elapsed: None,
            outcome: AttemptOutcome::InFlight,
        });
        index
    }

    /// Set the outcome of an in-flight attempt. Outcomes are final.
    pub fn finish_attempt(&mut self, index: usize, outcome: AttemptOutcome, elapsed: Duration) {
        if let Some(attempt) = self.attempts.get_mut(index) {
            if attempt.outcome == AttemptOutcome::InFlight {
                attempt.outcome = outcome;
                attempt.elapsed = Some(elapsed);
            }
        }
    }

    /// Record the error of an attempt that is being retried.
    pub fn record_error(&mut self, index: usize, node: Arc<Node>, error: NodeError) {
        self.errors.push((index, node, error));
    }

    pub fn speculative_started(&mut self) {
        self.speculative_execution_count += 1;
    }

    fn cancel_in_flight(&mut self) {
        for attempt in &mut self.attempts {
            if attempt.outcome == AttemptOutcome::InFlight {
                attempt.outcome = AttemptOutcome::Cancelled;
            }
        }
    }

    fn freeze(&self, coordinator: Option<Arc<Node>>) -> ExecutionInfo {
        let mut errors = self.errors.clone();
        errors.sort_by_key(|(index, _, _)| *index);

        ExecutionInfo {
            statement: Arc::clone(&self.statement),
            coordinator,
            successful_execution_index: None,
            speculative_execution_count: self.speculative_execution_count,
            errors: errors.into_iter().map(|(_, node, error)| (node, error)).collect(),
            warnings: Vec::new(),
            incoming_payload: HashMap::new(),
            paging_state: None,
            tracing_id: None,
            response_size_in_bytes: UNKNOWN_SIZE,
            compressed_response_size_in_bytes: UNKNOWN_SIZE,
            schema_in_agreement: true,
            attempts: self.attempts.clone(),
        }
    }

    /// Freeze for a successful (or ignored) execution. Attempts of other
    /// executions still in flight are marked cancelled.
    pub fn success(&mut self, coordinator: Arc<Node>, attempt_index: usize, response: &Response) -> ExecutionInfo {
        self.cancel_in_flight();
        let mut info = self.freeze(Some(coordinator));
        info.successful_execution_index = Some(attempt_index);
        info.warnings = response.warnings.clone();
        info.incoming_payload = response.custom_payload.clone();
        info.paging_state = response.paging_state.clone();
        info.tracing_id = response.tracing_id;
        info.response_size_in_bytes = size_or_unknown(response.size_in_bytes);
        info.compressed_response_size_in_bytes = size_or_unknown(response.compressed_size_in_bytes);
        info.schema_in_agreement = response.schema_in_agreement;
        info
    }

    /// Freeze for a failed or cancelled execution. Response metadata keeps
    /// its absent values.
    pub fn failure(&mut self, coordinator: Option<Arc<Node>>) -> ExecutionInfo {
        self.cancel_in_flight();
        self.freeze(coordinator)
    }
}

fn size_or_unknown(size: Option<u64>) -> i64 {
    size.and_then(|s| i64::try_from(s).ok()).unwrap_or(UNKNOWN_SIZE)
}

/// Record shared by every execution of one logical request.
#[derive(Clone)]
pub(crate) struct SharedRecord(Arc<Mutex<ExecutionRecord>>);

impl SharedRecord {
    pub fn new(statement: Arc<Statement>) -> Self {
        Self(Arc::new(Mutex::new(ExecutionRecord::new(statement))))
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut ExecutionRecord) -> R) -> R {
        let mut record = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut record)
    }
}
