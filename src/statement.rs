//! Statements
//!
//! A statement is an immutable description of one query: its text, values
//! and the per-statement overrides the engine honors.

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Consistency level requested for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANY" => Ok(Consistency::Any),
            "ONE" => Ok(Consistency::One),
            "TWO" => Ok(Consistency::Two),
            "THREE" => Ok(Consistency::Three),
            "QUORUM" => Ok(Consistency::Quorum),
            "ALL" => Ok(Consistency::All),
            "LOCAL_QUORUM" => Ok(Consistency::LocalQuorum),
            "EACH_QUORUM" => Ok(Consistency::EachQuorum),
            "SERIAL" => Ok(Consistency::Serial),
            "LOCAL_SERIAL" => Ok(Consistency::LocalSerial),
            "LOCAL_ONE" => Ok(Consistency::LocalOne),
            other => Err(DriverError::Config(format!("Unknown consistency level '{}'", other))),
        }
    }
}

/// Kind of write a replica timed out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteType {
    Simple,
    Batch,
    UnloggedBatch,
    Counter,
    BatchLog,
    Cas,
    View,
    Cdc,
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteType::Simple => "SIMPLE",
            WriteType::Batch => "BATCH",
            WriteType::UnloggedBatch => "UNLOGGED_BATCH",
            WriteType::Counter => "COUNTER",
            WriteType::BatchLog => "BATCH_LOG",
            WriteType::Cas => "CAS",
            WriteType::View => "VIEW",
            WriteType::Cdc => "CDC",
        };
        f.write_str(name)
    }
}

impl FromStr for WriteType {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SIMPLE" => Ok(WriteType::Simple),
            "BATCH" => Ok(WriteType::Batch),
            "UNLOGGED_BATCH" => Ok(WriteType::UnloggedBatch),
            "COUNTER" => Ok(WriteType::Counter),
            "BATCH_LOG" => Ok(WriteType::BatchLog),
            "CAS" => Ok(WriteType::Cas),
            "VIEW" => Ok(WriteType::View),
            "CDC" => Ok(WriteType::Cdc),
            other => Err(DriverError::Config(format!("Unknown write type '{}'", other))),
        }
    }
}

/// A query plus the options that travel with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Query text
    pub query: String,

    /// Positional bound values
    pub values: Vec<serde_json::Value>,

    /// Whether the statement may safely be applied more than once.
    /// `None` falls back to the configured default.
    pub idempotent: Option<bool>,

    pub consistency: Option<Consistency>,

    pub page_size: Option<u32>,

    /// Paging state of the page to resume from
    pub paging_state: Option<Vec<u8>>,

    /// Request server-side tracing
    pub tracing: bool,

    /// Custom payload sent along with the query
    pub custom_payload: HashMap<String, Vec<u8>>,

    /// Per-attempt timeout override
    pub timeout: Option<Duration>,
}

impl Statement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            values: Vec::new(),
            idempotent: None,
            consistency: None,
            page_size: None,
            paging_state: None,
            tracing: false,
            custom_payload: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.values = values;
        self
    }

    pub fn with_idempotence(mut self, idempotent: bool) -> Self {
        self.idempotent = Some(idempotent);
        self
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_paging_state(mut self, paging_state: Vec<u8>) -> Self {
        self.paging_state = Some(paging_state);
        self
    }

    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn with_custom_payload(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.custom_payload.insert(key.into(), value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&str> for Statement {
    fn from(query: &str) -> Self {
        Statement::new(query)
    }
}

impl From<String> for Statement {
    fn from(query: String) -> Self {
        Statement::new(query)
    }
}
