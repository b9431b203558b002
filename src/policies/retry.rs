//! Retry Policies
//!
//! A retry policy looks at the error of one attempt and decides what the
//! engine does next. Policies are pure: no I/O, same answer for the same
//! inputs.

use crate::error::NodeError;
use crate::statement::{Statement, WriteType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the engine should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetryDecision {
    /// Try the same node again
    RetrySame,
    /// Move on to the next node of the query plan
    RetryNext,
    /// Surface the error to the caller
    Rethrow,
    /// Complete the execution with an empty result
    Ignore,
}

impl fmt::Display for RetryDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDecision::RetrySame => write!(f, "RETRY_SAME"),
            RetryDecision::RetryNext => write!(f, "RETRY_NEXT"),
            RetryDecision::Rethrow => write!(f, "RETHROW"),
            RetryDecision::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// Retry policy contract.
///
/// `retry_count` is the number of retries already performed by the
/// execution that produced `error` (0 on its first attempt).
pub trait RetryPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_error(
        &self,
        error: &NodeError,
        statement: &Statement,
        retry_count: u32,
        is_idempotent: bool,
    ) -> RetryDecision;
}

/// Conservative default: retries at most once for errors that are known to
/// be transient, and only moves on to another node when that cannot apply
/// a non-idempotent statement twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy;

impl DefaultRetryPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn name(&self) -> &'static str {
        "DefaultRetryPolicy"
    }

    fn on_error(
        &self,
        error: &NodeError,
        _statement: &Statement,
        retry_count: u32,
        is_idempotent: bool,
    ) -> RetryDecision {
        match error {
            // Another coordinator may see a different set of live replicas
            NodeError::Unavailable { .. } => {
                if retry_count == 0 {
                    RetryDecision::RetryNext
                } else {
                    RetryDecision::Rethrow
                }
            }
            // Enough replicas answered but the one asked for data did not
            NodeError::ReadTimeout {
                received,
                block_for,
                data_present,
                ..
            } => {
                if retry_count == 0 && received >= block_for && !data_present {
                    RetryDecision::RetrySame
                } else {
                    RetryDecision::Rethrow
                }
            }
            NodeError::WriteTimeout { write_type, .. } => {
                if is_idempotent && retry_count == 0 && *write_type == WriteType::BatchLog {
                    RetryDecision::RetrySame
                } else {
                    RetryDecision::Rethrow
                }
            }
            NodeError::Timeout(_)
            | NodeError::ConnectionError(_)
            | NodeError::Overloaded(_)
            | NodeError::ServerError(_) => {
                if is_idempotent {
                    RetryDecision::RetryNext
                } else {
                    RetryDecision::Rethrow
                }
            }
            // The node never started executing the query
            NodeError::Bootstrapping => RetryDecision::RetryNext,
            NodeError::InvalidQuery(_) | NodeError::SyntaxError(_) | NodeError::Unauthorized(_) => {
                RetryDecision::Rethrow
            }
        }
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallthroughRetryPolicy;

impl RetryPolicy for FallthroughRetryPolicy {
    fn name(&self) -> &'static str {
        "FallthroughRetryPolicy"
    }

    fn on_error(&self, _: &NodeError, _: &Statement, _: u32, _: bool) -> RetryDecision {
        RetryDecision::Rethrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Consistency;
    use std::time::Duration;

    fn statement() -> Statement {
        Statement::new("select * from foo")
    }

    fn unavailable() -> NodeError {
        NodeError::Unavailable {
            consistency: Consistency::One,
            required: 1,
            alive: 0,
        }
    }

    #[test]
    fn test_unavailable_moves_on_once() {
        let policy = DefaultRetryPolicy::new();
        assert_eq!(policy.on_error(&unavailable(), &statement(), 0, false), RetryDecision::RetryNext);
        assert_eq!(policy.on_error(&unavailable(), &statement(), 1, false), RetryDecision::Rethrow);
    }

    #[test]
    fn test_invalid_query_is_rethrown() {
        let policy = DefaultRetryPolicy::new();
        let error = NodeError::InvalidQuery("Mock error message".to_string());
        assert_eq!(policy.on_error(&error, &statement(), 0, true), RetryDecision::Rethrow);
    }

    #[test]
    fn test_read_timeout_retries_same_when_data_missing() {
        let policy = DefaultRetryPolicy::new();
        let missing_data = NodeError::ReadTimeout {
            consistency: Consistency::Quorum,
            received: 2,
            block_for: 2,
            data_present: false,
        };
        let not_enough = NodeError::ReadTimeout {
            consistency: Consistency::Quorum,
            received: 1,
            block_for: 2,
            data_present: false,
        };
        assert_eq!(policy.on_error(&missing_data, &statement(), 0, false), RetryDecision::RetrySame);
        assert_eq!(policy.on_error(&missing_data, &statement(), 1, false), RetryDecision::Rethrow);
        assert_eq!(policy.on_error(&not_enough, &statement(), 0, false), RetryDecision::Rethrow);
    }

    #[test]
    fn test_write_timeout_only_for_idempotent_batch_log() {
        let policy = DefaultRetryPolicy::new();
        let batch_log = NodeError::WriteTimeout {
            consistency: Consistency::Quorum,
            received: 0,
            block_for: 1,
            write_type: WriteType::BatchLog,
        };
        let simple = NodeError::WriteTimeout {
            consistency: Consistency::Quorum,
            received: 0,
            block_for: 1,
            write_type: WriteType::Simple,
        };
        assert_eq!(policy.on_error(&batch_log, &statement(), 0, true), RetryDecision::RetrySame);
        assert_eq!(policy.on_error(&batch_log, &statement(), 0, false), RetryDecision::Rethrow);
        assert_eq!(policy.on_error(&simple, &statement(), 0, true), RetryDecision::Rethrow);
    }

    #[test]
    fn test_aborted_requests_depend_on_idempotence() {
        let policy = DefaultRetryPolicy::new();
        let timeout = NodeError::Timeout(Duration::from_millis(100));
        let closed = NodeError::ConnectionError("connection reset".to_string());
        for error in [timeout, closed] {
            assert_eq!(policy.on_error(&error, &statement(), 0, true), RetryDecision::RetryNext);
            assert_eq!(policy.on_error(&error, &statement(), 0, false), RetryDecision::Rethrow);
        }
    }

    #[test]
    fn test_fallthrough_never_retries() {
        let policy = FallthroughRetryPolicy;
        assert_eq!(policy.on_error(&unavailable(), &statement(), 0, true), RetryDecision::Rethrow);
        assert_eq!(policy.on_error(&NodeError::Bootstrapping, &statement(), 0, true), RetryDecision::Rethrow);
    }
}
