//! Error Types
//!
//! `NodeError` is what a single attempt against one node can fail with.
//! `DriverError` is what the caller of a logical execution receives.

use crate::execution::ExecutionInfo;
use crate::statement::{Consistency, WriteType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of one attempt against one node.
///
/// This type never carries an `ExecutionInfo`: errors that were retried are
/// stored as-is in the record of the execution that retried them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeError {
    #[error("Not enough replicas available for query at consistency {consistency} ({required} required but only {alive} alive)")]
    Unavailable {
        consistency: Consistency,
        required: u32,
        alive: u32,
    },

    #[error("Timeout during read query at consistency {consistency} ({block_for} responses were required but only {received} replica responded{})", read_timeout_suffix(.data_present))]
    ReadTimeout {
        consistency: Consistency,
        received: u32,
        block_for: u32,
        data_present: bool,
    },

    #[error("Timeout during {write_type} write query at consistency {consistency} ({block_for} replica were required but only {received} acknowledged the write)")]
    WriteTimeout {
        consistency: Consistency,
        received: u32,
        block_for: u32,
        write_type: WriteType,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Coordinator overloaded: {0}")]
    Overloaded(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Coordinator is bootstrapping")]
    Bootstrapping,

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

fn read_timeout_suffix(data_present: &bool) -> &'static str {
    if *data_present {
        ""
    } else {
        ", the replica queried for data didn't respond"
    }
}

impl NodeError {
    /// Coarse classification used by metrics and by `DriverError::kind`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::Unavailable { .. } | NodeError::Bootstrapping => {
                ErrorKind::CoordinatorUnavailable
            }
            NodeError::InvalidQuery(_) | NodeError::SyntaxError(_) | NodeError::Unauthorized(_) => {
                ErrorKind::QueryInvalid
            }
            NodeError::ReadTimeout { .. } | NodeError::WriteTimeout { .. } | NodeError::Timeout(_) => {
                ErrorKind::Timeout
            }
            NodeError::ConnectionError(_) => ErrorKind::ConnectionError,
            NodeError::Overloaded(_) | NodeError::ServerError(_) => ErrorKind::ServerError,
        }
    }

    /// Whether the node answered with this error. Client-side timeouts and
    /// connection failures are the only errors no node ever sent.
    pub fn is_server_response(&self) -> bool {
        !matches!(self, NodeError::Timeout(_) | NodeError::ConnectionError(_))
    }
}

/// Error taxonomy shared by node errors and driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    CoordinatorUnavailable,
    QueryInvalid,
    Timeout,
    ConnectionError,
    ServerError,
    PolicyExhausted,
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error returned to the caller of a logical execution.
///
/// Every variant produced by the engine carries the execution record that
/// was accumulated up to the terminal failure.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The retry policy rethrew the error of the final attempt.
    #[error("{error}")]
    Query {
        error: NodeError,
        execution_info: Box<ExecutionInfo>,
    },

    /// The query plan ran out of nodes while the retry policy still wanted
    /// to move on. `last` is the error of the final attempt.
    #[error("All nodes tried for the query failed (last error: {last})")]
    AllNodesFailed {
        last: NodeError,
        execution_info: Box<ExecutionInfo>,
    },

    #[error("No node was available to execute the query")]
    NoNodeAvailable { execution_info: Box<ExecutionInfo> },

    #[error("Request was cancelled")]
    Cancelled { execution_info: Box<ExecutionInfo> },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    /// Record of the execution that ended with this error, if the error came
    /// out of the engine.
    pub fn execution_info(&self) -> Option<&ExecutionInfo> {
        match self {
            DriverError::Query { execution_info, .. }
            | DriverError::AllNodesFailed { execution_info, .. }
            | DriverError::NoNodeAvailable { execution_info }
            | DriverError::Cancelled { execution_info } => Some(execution_info),
            _ => None,
        }
    }

    /// Node error surfaced by this failure.
    pub fn node_error(&self) -> Option<&NodeError> {
        match self {
            DriverError::Query { error, .. } => Some(error),
            DriverError::AllNodesFailed { last, .. } => Some(last),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Query { error, .. } => error.kind(),
            DriverError::AllNodesFailed { .. } | DriverError::NoNodeAvailable { .. } => {
                ErrorKind::PolicyExhausted
            }
            DriverError::Cancelled { .. } => ErrorKind::Cancelled,
            DriverError::Internal(_)
            | DriverError::Config(_)
            | DriverError::Io(_)
            | DriverError::Json(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
