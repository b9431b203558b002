//! Observability Module
//!
//! Counters the engine keeps per node. Logging goes through `tracing`.

pub mod metrics;

pub use metrics::{EngineMetrics, NodeMetrics};
