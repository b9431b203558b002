//! Responses
//!
//! What a node sends back for a successful attempt, and what the engine
//! hands to the caller.

use crate::execution::ExecutionInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type Row = Vec<serde_json::Value>;

/// Response of one successful attempt, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub rows: Vec<Row>,

    /// Server-side warnings
    pub warnings: Vec<String>,

    /// Custom payload sent back by the server
    pub custom_payload: HashMap<String, Vec<u8>>,

    /// Paging state of the next page, if there is one
    pub paging_state: Option<Vec<u8>>,

    /// Tracing session id, when tracing was requested
    pub tracing_id: Option<Uuid>,

    /// Size of the response frame, when the transport knows it
    pub size_in_bytes: Option<u64>,

    /// Size of the compressed response frame, when compression was used
    pub compressed_size_in_bytes: Option<u64>,

    pub schema_in_agreement: bool,
}

impl Response {
    /// Response with no rows and no metadata. Also what an ignored error
    /// completes with.
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            warnings: Vec::new(),
            custom_payload: HashMap::new(),
            paging_state: None,
            tracing_id: None,
            size_in_bytes: None,
            compressed_size_in_bytes: None,
            schema_in_agreement: true,
        }
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::empty()
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty()
    }
}

/// Successful outcome of a logical execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Response,
    pub info: ExecutionInfo,
}

impl ExecutionResult {
    pub fn rows(&self) -> &[Row] {
        &self.response.rows
    }

    pub fn execution_info(&self) -> &ExecutionInfo {
        &self.info
    }

    pub fn into_parts(self) -> (Response, ExecutionInfo) {
        (self.response, self.info)
    }
}
